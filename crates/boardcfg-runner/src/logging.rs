//! Log output for the binary.

use tracing_subscriber::EnvFilter;

use crate::error::{RunnerError, RunnerResult};

/// Filter directive for `--log-level` raised by `-v` flags.
pub fn filter_directive(level: &str, verbose: u8) -> String {
    match verbose {
        0 => level.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides the command-line level.
pub fn init_logging(level: &str, verbose: u8) -> RunnerResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(level, verbose))
            .map_err(|e| RunnerError::Logging(e.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| RunnerError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("warn", 0), "warn");
        assert_eq!(filter_directive("warn", 1), "debug");
        assert_eq!(filter_directive("info", 3), "trace");
    }
}
