//! Serial port transport.

use std::io::{self, Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

use crate::error::{TransportError, TransportResult};
use crate::transport::{Transport, TransportKind};

/// Baud rate the configuration sketch listens on.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Per-read deadline.
pub const DEFAULT_READ_DEADLINE_MS: u64 = 2500;

/// Serial link parameters. The frame format is fixed at 8N1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialParams {
    /// Port name, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_deadline_ms")]
    pub read_deadline_ms: u64,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_deadline_ms() -> u64 {
    DEFAULT_READ_DEADLINE_MS
}

impl SerialParams {
    pub fn new(port: impl Into<String>) -> Self {
        SerialParams {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_deadline_ms: DEFAULT_READ_DEADLINE_MS,
        }
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }
}

/// Transport over a local serial port.
pub struct SerialTransport {
    params: SerialParams,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(params: SerialParams) -> Self {
        SerialTransport { params, port: None }
    }

    pub fn params(&self) -> &SerialParams {
        &self.params
    }

    fn port_mut(&mut self) -> TransportResult<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn connect(&mut self) -> TransportResult<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(&self.params.port, self.params.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(self.params.read_deadline())
            .open()
            .map_err(|source| TransportError::Open {
                port: self.params.port.clone(),
                source,
            })?;
        debug!(
            "opened {} at {} baud",
            self.params.port, self.params.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        trace!("tx {}", hex::encode(bytes));
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        let port = self.port_mut()?;
        match port.read(buf) {
            Ok(0) => Err(TransportError::Disconnected),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> TransportResult<()> {
        if self.port.take().is_some() {
            debug!("closed {}", self.params.port);
        }
        Ok(())
    }
}
