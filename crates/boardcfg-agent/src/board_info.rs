//! One-shot queries against a connected board.

use std::time::{Duration, Instant};

use boardcfg_protocol::{BoardCommand, Message, WifiNetwork, UNIQUE_ID_LEN};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::configure::{handle_status, session_closed, SessionState};
use crate::engine::ProtocolEngine;
use crate::error::ConfigureError;
use crate::transport::Transport;

/// Budget of a single query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between the timestamp and the identity request.
pub const IDENTITY_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Identity material reported in answer to `GetId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub unique_id: [u8; UNIQUE_ID_LEN],
    /// Signature text with the board's trailing padding removed.
    pub signature: String,
    pub public_key: Option<String>,
}

impl DeviceIdentity {
    /// Unique id as lowercase hex.
    pub fn unique_id_hex(&self) -> String {
        hex::encode(self.unique_id)
    }
}

/// Request/response helper over a borrowed engine.
pub struct BoardQuery<'a, T: Transport> {
    engine: &'a mut ProtocolEngine<T>,
    cancel: CancelToken,
    timeout: Duration,
    settle_delay: Duration,
}

impl<'a, T: Transport> BoardQuery<'a, T> {
    pub fn new(engine: &'a mut ProtocolEngine<T>, cancel: CancelToken) -> Self {
        BoardQuery {
            engine,
            cancel,
            timeout: QUERY_TIMEOUT,
            settle_delay: IDENTITY_SETTLE_DELAY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn sketch_version(&mut self) -> Result<String, ConfigureError> {
        self.request(BoardCommand::GetSketchVersion, "sketch version", |m| match m {
            Message::SketchVersion(v) => Some(v),
            _ => None,
        })
    }

    pub fn wifi_fw_version(&mut self) -> Result<String, ConfigureError> {
        self.request(BoardCommand::GetWifiFwVersion, "WiFi firmware version", |m| match m {
            Message::WifiFwVersion(v) => Some(v),
            _ => None,
        })
    }

    pub fn netconfig_lib_version(&mut self) -> Result<String, ConfigureError> {
        self.request(
            BoardCommand::GetNetConfigLibVersion,
            "NetworkConfigurator library version",
            |m| match m {
                Message::NetConfigLibVersion(v) => Some(v),
                _ => None,
            },
        )
    }

    pub fn ble_mac_address(&mut self) -> Result<[u8; 6], ConfigureError> {
        self.request(BoardCommand::GetBleMac, "BLE MAC address", |m| match m {
            Message::BleMacAddress(mac) => Some(mac),
            _ => None,
        })
    }

    /// Networks seen by the board's last scan.
    pub fn scan_networks(&mut self) -> Result<Vec<WifiNetwork>, ConfigureError> {
        self.request(BoardCommand::ScanWifi, "WiFi network list", |m| match m {
            Message::WifiNetworks(networks) => Some(networks),
            _ => None,
        })
    }

    /// Ask the board to drop its stored network settings.
    pub fn reset_board(&mut self) -> Result<(), ConfigureError> {
        self.request(BoardCommand::Reset, "reset confirmation", |m| match m {
            Message::ProvisioningStatus(4) => Some(()),
            _ => None,
        })
    }

    /// Send the timestamp, then `GetId`, and collect the identity answers.
    ///
    /// The link is serviced between the two sends so that a NACK of the
    /// timestamp resends the timestamp.
    pub fn device_identity(&mut self, timestamp: u64) -> Result<DeviceIdentity, ConfigureError> {
        self.engine.send_data(&Message::Timestamp(timestamp))?;
        self.engine.settle(self.settle_delay, &self.cancel)?;
        self.engine.send_data(&Message::command(BoardCommand::GetId))?;

        let deadline = Instant::now() + self.timeout;
        let mut public_key: Option<String> = None;
        let mut unique_id: Option<[u8; UNIQUE_ID_LEN]> = None;
        let mut signature: Option<String> = None;

        loop {
            if let (Some(unique_id), Some(signature)) = (unique_id, signature.as_ref()) {
                info!("received device identity");
                return Ok(DeviceIdentity {
                    unique_id,
                    signature: signature.clone(),
                    public_key,
                });
            }
            match self.next_message(deadline)? {
                None => {
                    let missing = if unique_id.is_none() { "unique id" } else { "signature" };
                    return Err(ConfigureError::timeout(format!(
                        "no {} received from the device, please retry",
                        missing
                    )));
                }
                Some(Message::PublicKey(key)) => public_key = Some(key),
                Some(Message::UniqueId(id)) => unique_id = Some(id),
                Some(Message::Signature(raw)) => signature = Some(trim_signature(&raw)),
                Some(other) => self.check_status(other)?,
            }
        }
    }

    fn request<R>(
        &mut self,
        command: BoardCommand,
        what: &str,
        mut extract: impl FnMut(Message) -> Option<R>,
    ) -> Result<R, ConfigureError> {
        debug!("requesting {}", what);
        self.engine.send_data(&Message::command(command))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let message = self.next_message(deadline)?.ok_or_else(|| {
                ConfigureError::timeout(format!("no {} received from the device, please retry", what))
            })?;
            if let Message::ProvisioningStatus(status) = message {
                if status < 0 {
                    self.check_status(message)?;
                    continue;
                }
            }
            match extract(message) {
                Some(answer) => return Ok(answer),
                None => continue,
            }
        }
    }

    fn next_message(&mut self, deadline: Instant) -> Result<Option<Message>, ConfigureError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        let message = self.engine.receive_data(remaining, &self.cancel)?;
        if message.is_none() && !self.engine.is_connected() {
            return Err(session_closed());
        }
        Ok(message)
    }

    /// Fail on a negative status with a terminal meaning; ignore anything else.
    fn check_status(&self, message: Message) -> Result<(), ConfigureError> {
        match message {
            Message::ProvisioningStatus(status) if status < 0 => {
                handle_status(SessionState::End, status).map(|_| ())
            }
            other => {
                debug!("ignoring {} while waiting for an answer", other.kind());
                Ok(())
            }
        }
    }
}

/// Signature text without the board's non-alphanumeric padding.
fn trim_signature(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}
