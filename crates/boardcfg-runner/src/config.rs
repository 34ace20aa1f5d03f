//! Network configuration input.

use std::fs;
use std::path::Path;

use boardcfg_protocol::NetConfig;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Format implied by the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

/// Load a [`NetConfig`] from a `.json`, `.yaml` or `.yml` file.
pub fn load_net_config(path: &Path) -> RunnerResult<NetConfig> {
    let format =
        ConfigFormat::from_path(path).ok_or_else(|| RunnerError::UnknownFormat(path.to_path_buf()))?;
    let text = fs::read_to_string(path).map_err(|source| RunnerError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;

    let config: NetConfig = match format {
        ConfigFormat::Json => serde_json::from_str(&text).map_err(|source| RunnerError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        ConfigFormat::Yaml => serde_yaml::from_str(&text).map_err(|source| RunnerError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };
    debug!("loaded network configuration type {} from {}", config.kind, path.display());
    Ok(config)
}

/// Pick the configuration from a file or from WiFi credentials given on the
/// command line.
pub fn resolve_net_config(
    file: Option<&Path>,
    ssid: Option<&str>,
    password: Option<&str>,
) -> RunnerResult<NetConfig> {
    match (file, ssid, password) {
        (Some(path), None, None) => load_net_config(path),
        (None, Some(ssid), Some(password)) => Ok(NetConfig::wifi(ssid, password)),
        (None, None, None) => Err(RunnerError::InvalidArguments(
            "either --config or --ssid with --password is required".to_string(),
        )),
        _ => Err(RunnerError::InvalidArguments(
            "--config cannot be combined with --ssid/--password".to_string(),
        )),
    }
}
