//! Command-line arguments.

use std::path::PathBuf;

use boardcfg_agent::{SerialParams, DEFAULT_BAUD_RATE, DEFAULT_READ_DEADLINE_MS};
use clap::{Parser, Subcommand};

/// Configure Arduino boards running the NetworkConfigurator library.
#[derive(Parser, Debug)]
#[command(name = "boardcfg", version)]
pub struct Cli {
    /// Serial port of the board, e.g. /dev/ttyACM0 or COM3.
    #[arg(long)]
    pub port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Deadline of a single serial read in milliseconds.
    #[arg(long, default_value_t = DEFAULT_READ_DEADLINE_MS)]
    pub read_deadline_ms: u64,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a network configuration and wait for the board to connect.
    Configure {
        /// JSON or YAML network configuration file.
        #[arg(long, conflicts_with_all = ["ssid", "password"])]
        config: Option<PathBuf>,

        /// WiFi network name.
        #[arg(long, requires = "password")]
        ssid: Option<String>,

        /// WiFi password.
        #[arg(long, requires = "ssid")]
        password: Option<String>,
    },
    /// List the WiFi networks the board can see, strongest first.
    Scan,
    /// Print sketch, firmware and library versions and the BLE MAC address.
    Info {
        /// Report whether the NetworkConfigurator library meets this version.
        #[arg(long)]
        min_lib_version: Option<String>,
    },
    /// Ask the board to reset its network settings.
    Reset,
}

impl Cli {
    pub fn serial_params(&self) -> SerialParams {
        SerialParams {
            port: self.port.clone(),
            baud_rate: self.baud,
            read_deadline_ms: self.read_deadline_ms,
        }
    }
}
