//! Command-line front end for the board configuration agent.
//!
//! The `boardcfg` binary parses arguments with [`Cli`], sets up logging,
//! wires Ctrl-C to a [`CancelToken`](boardcfg_agent::CancelToken) and hands
//! the subcommand to [`execute`] over a serial transport. [`execute`] is
//! generic over the transport so the same paths run against a mock board.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use cli::{Cli, Command};
pub use commands::{execute, RunOptions};
pub use config::{load_net_config, resolve_net_config, ConfigFormat};
pub use error::{RunnerError, RunnerResult};
pub use logging::init_logging;
