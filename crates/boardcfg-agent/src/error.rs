//! Error types for the transport, the engine and the configuration flow.

use std::fmt;
use std::io;

use boardcfg_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by a [`Transport`](crate::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The port could not be opened (missing, busy or no permission).
    #[error("cannot open port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Read or write failure on an open port.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation on a transport that is not connected.
    #[error("transport not connected")]
    NotConnected,

    /// The peer went away; a read returned no data without a deadline.
    #[error("connection closed by peer")]
    Disconnected,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by the [`ProtocolEngine`](crate::ProtocolEngine).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected to the board")]
    NotConnected,

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Broad class of a failed configuration or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The link to the board failed or was never established.
    ConnectivityLost,
    /// The board could not join the network with the supplied settings.
    InvalidCredentials,
    /// The board is processing another request.
    Busy,
    /// Connectivity module, secure element or UHWID failure.
    HardwareError,
    StorageError,
    /// The configuration cannot be expressed or was rejected as invalid.
    UnsupportedConfig,
    /// A wait state ran out of time.
    Timeout,
    Cancelled,
    Generic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::ConnectivityLost => "connectivity lost",
            ErrorCategory::InvalidCredentials => "invalid credentials",
            ErrorCategory::Busy => "busy",
            ErrorCategory::HardwareError => "hardware error",
            ErrorCategory::StorageError => "storage error",
            ErrorCategory::UnsupportedConfig => "unsupported configuration",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Generic => "error",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a failed session: a category plus the message shown
/// to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct ConfigureError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ConfigureError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        ConfigureError {
            category,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ConfigureError::new(ErrorCategory::Timeout, message)
    }

    pub fn cancelled() -> Self {
        ConfigureError::new(ErrorCategory::Cancelled, "operation cancelled by the user")
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl From<EngineError> for ConfigureError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => ConfigureError::cancelled(),
            EngineError::NotConnected => ConfigureError::new(
                ErrorCategory::ConnectivityLost,
                "connection with the board lost",
            ),
            EngineError::Transport(e) => {
                ConfigureError::new(ErrorCategory::ConnectivityLost, format!("communication error: {}", e))
            }
            EngineError::Protocol(e) => ConfigureError::new(ErrorCategory::UnsupportedConfig, e.to_string()),
        }
    }
}
