//! Subcommand execution.

use std::cmp::Ordering;
use std::io::Write;
use std::time::Duration;

use boardcfg_agent::{
    compare_versions, network_configure, BoardQuery, CancelToken, ConfigureError, ConfigureOptions,
    ErrorCategory, ProtocolEngine, Transport, QUERY_TIMEOUT,
};
use tracing::{debug, info};

use crate::cli::Command;
use crate::config::resolve_net_config;
use crate::error::RunnerResult;

/// Budgets used by the subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub configure: ConfigureOptions,
    /// Budget of each board query (`scan`, `info`, `reset`).
    pub query_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            configure: ConfigureOptions::default(),
            query_timeout: QUERY_TIMEOUT,
        }
    }
}

/// Run `command` over `transport`, writing results to `out`.
pub fn execute<T: Transport, W: Write>(
    command: &Command,
    transport: T,
    cancel: &CancelToken,
    options: &RunOptions,
    out: &mut W,
) -> RunnerResult<()> {
    match command {
        Command::Configure {
            config,
            ssid,
            password,
        } => {
            let net_config = resolve_net_config(config.as_deref(), ssid.as_deref(), password.as_deref())?;
            network_configure(transport, &net_config, cancel, &options.configure)?;
            writeln!(out, "board connected to the network")?;
        }
        Command::Scan => {
            let mut engine = open_engine(transport)?;
            let mut networks = BoardQuery::new(&mut engine, cancel.clone())
                .with_timeout(options.query_timeout)
                .scan_networks()?;
            engine.close()?;

            networks.sort_by(|a, b| b.rssi.cmp(&a.rssi));
            if networks.is_empty() {
                writeln!(out, "no networks found")?;
            }
            for network in &networks {
                writeln!(out, "{:>5} dBm  {}", network.rssi, network.ssid)?;
            }
        }
        Command::Info { min_lib_version } => {
            let mut engine = open_engine(transport)?;
            let mut query = BoardQuery::new(&mut engine, cancel.clone()).with_timeout(options.query_timeout);

            let sketch = optional(query.sketch_version())?;
            let firmware = optional(query.wifi_fw_version())?;
            let library = optional(query.netconfig_lib_version())?;
            let mac = optional(query.ble_mac_address())?.map(|mac| format_mac(&mac));
            engine.close()?;

            writeln!(out, "sketch version:        {}", or_unavailable(&sketch))?;
            writeln!(out, "WiFi firmware version: {}", or_unavailable(&firmware))?;
            writeln!(out, "NetConfig lib version: {}", or_unavailable(&library))?;
            writeln!(out, "BLE MAC address:       {}", or_unavailable(&mac))?;

            if let (Some(required), Some(actual)) = (min_lib_version, &library) {
                let verdict = match compare_versions(actual, required)? {
                    Ordering::Less => "below",
                    Ordering::Equal | Ordering::Greater => "meets",
                };
                writeln!(out, "NetConfig lib {} {} required {}", actual, verdict, required)?;
            }
        }
        Command::Reset => {
            let mut engine = open_engine(transport)?;
            BoardQuery::new(&mut engine, cancel.clone())
                .with_timeout(options.query_timeout)
                .reset_board()?;
            engine.close()?;
            writeln!(out, "board network settings reset")?;
        }
    }
    Ok(())
}

fn open_engine<T: Transport>(transport: T) -> RunnerResult<ProtocolEngine<T>> {
    let mut engine = ProtocolEngine::new(transport);
    engine.connect()?;
    info!("session opened");
    Ok(engine)
}

/// Turn a failed query into a missing value; cancellation still aborts.
fn optional<R>(result: Result<R, ConfigureError>) -> Result<Option<R>, ConfigureError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.category() == ErrorCategory::Cancelled => Err(e),
        Err(e) => {
            debug!("query failed: {}", e);
            Ok(None)
        }
    }
}

fn or_unavailable(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unavailable")
}

fn format_mac(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}
