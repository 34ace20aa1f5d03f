//! Network configuration state machine.
//!
//! Drives a connected board from its first status report, through the
//! optional WiFi scan, to the delivery of a [`NetConfig`] and the outcome of
//! the board's connection attempt.

use std::fmt;
use std::time::{Duration, Instant};

use boardcfg_protocol::{BoardCommand, Message, NetConfig, StatusCode, WifiNetwork};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::engine::ProtocolEngine;
use crate::error::{ConfigureError, ErrorCategory};
use crate::transport::Transport;

// ============================================================================
// Configuration Types
// ============================================================================

/// Wait budgets of the configuration flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureOptions {
    /// Wait for the first status after the session opens.
    pub initial_status_timeout: Duration,
    /// Wait for the WiFi scan results.
    pub network_options_timeout: Duration,
    /// Wait for the board to acknowledge the connect command.
    pub command_result_timeout: Duration,
    /// Wait for the board to report the connection outcome.
    pub connection_result_timeout: Duration,
    /// Pause after sending the network settings.
    pub settle_delay: Duration,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            initial_status_timeout: Duration::from_secs(30),
            network_options_timeout: Duration::from_secs(30),
            command_result_timeout: Duration::from_secs(60),
            connection_result_timeout: Duration::from_secs(200),
            settle_delay: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Cursor of the configuration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    WaitForConnection,
    WaitingForInitialStatus,
    WaitingForNetworkOptions,
    BoardReady,
    ConfigureNetwork,
    SendConnectionRequest,
    WaitingForConnectionCommandResult,
    /// The board asked for the settings again.
    MissingParameter,
    WaitingForNetworkConfigResult,
    End,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Map a board status to the state to continue in, or to a terminal error.
///
/// Informational statuses keep the flow in `current`.
pub fn handle_status(current: SessionState, status: i16) -> Result<SessionState, ConfigureError> {
    let code = StatusCode::from_code(status);
    debug!("status message received: {}", code);

    let (category, message) = match code {
        StatusCode::Connecting
        | StatusCode::Connected
        | StatusCode::Reset
        | StatusCode::Disconnected => return Ok(current),
        StatusCode::ScanningNetworks => return Ok(SessionState::WaitingForNetworkOptions),
        StatusCode::ParametersNotProvided => return Ok(SessionState::MissingParameter),
        StatusCode::FailedToConnect => (
            ErrorCategory::InvalidCredentials,
            "connection failed: invalid network configuration",
        ),
        StatusCode::InvalidParameters => (
            ErrorCategory::UnsupportedConfig,
            "the provided parameters for network configuration are invalid",
        ),
        StatusCode::Busy => (
            ErrorCategory::Busy,
            "board is busy, restart the board and try again",
        ),
        StatusCode::InvalidRequest => (ErrorCategory::Generic, "invalid request sent to the board"),
        StatusCode::InternetNotAvailable => (
            ErrorCategory::ConnectivityLost,
            "internet not available, check your network connection",
        ),
        StatusCode::HwConnectivityError => (
            ErrorCategory::HardwareError,
            "hardware error in connectivity module, check the board",
        ),
        StatusCode::HwConnectivityStopped => (
            ErrorCategory::HardwareError,
            "hardware connectivity module stopped, restart the board and check your sketch",
        ),
        StatusCode::SecureElementInitError => (
            ErrorCategory::HardwareError,
            "error initializing secure element, check the board and try again",
        ),
        StatusCode::SecureElementConfigError => (
            ErrorCategory::HardwareError,
            "error configuring secure element, check the board and try again",
        ),
        StatusCode::SecureElementLockError => (
            ErrorCategory::HardwareError,
            "error locking secure element, check the board and try again",
        ),
        StatusCode::UhwidError => (
            ErrorCategory::HardwareError,
            "error generating UHWID, check the board and try again",
        ),
        StatusCode::StorageBeginError => (
            ErrorCategory::StorageError,
            "error beginning storage module, check the board storage partitioning and try again",
        ),
        StatusCode::StoragePartitionError => (
            ErrorCategory::StorageError,
            "failed to partition the storage, check the board storage and try again",
        ),
        StatusCode::GenericError | StatusCode::Other(_) => (
            ErrorCategory::Generic,
            "generic error, check the board and try again",
        ),
    };
    Err(ConfigureError::new(category, message))
}

// ============================================================================
// Network Configurator
// ============================================================================

/// Runs the configuration flow over an engine it borrows.
pub struct NetworkConfigurator<'a, T: Transport> {
    engine: &'a mut ProtocolEngine<T>,
    options: ConfigureOptions,
    cancel: CancelToken,
    state: SessionState,
    /// End of the current state's wait budget, set on its first receive.
    state_deadline: Option<Instant>,
    networks: Vec<WifiNetwork>,
}

impl<'a, T: Transport> NetworkConfigurator<'a, T> {
    pub fn new(engine: &'a mut ProtocolEngine<T>, options: ConfigureOptions, cancel: CancelToken) -> Self {
        NetworkConfigurator {
            engine,
            options,
            cancel,
            state: SessionState::WaitForConnection,
            state_deadline: None,
            networks: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Networks reported by the board during the scan phase.
    pub fn networks(&self) -> &[WifiNetwork] {
        &self.networks
    }

    /// Run to completion. The session is closed on every exit path.
    pub fn run(&mut self, net_config: &NetConfig) -> Result<(), ConfigureError> {
        let outcome = self.drive(net_config);
        self.state = SessionState::End;

        if let Err(e) = self.engine.close() {
            warn!("failed to close session: {}", e);
        }
        match &outcome {
            Ok(()) => info!("NetworkConfigure: board connected"),
            Err(e) => warn!("NetworkConfigure: {}", e),
        }
        outcome
    }

    fn drive(&mut self, net_config: &NetConfig) -> Result<(), ConfigureError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ConfigureError::cancelled());
            }
            let next = self.step(net_config)?;
            if next != self.state {
                debug!("NetworkConfigure: {} -> {}", self.state, next);
                self.state_deadline = None;
            }
            self.state = next;
            if self.state == SessionState::End {
                return Ok(());
            }
        }
    }

    fn step(&mut self, net_config: &NetConfig) -> Result<SessionState, ConfigureError> {
        use SessionState::*;

        let next = match self.state {
            WaitForConnection => {
                if !self.engine.is_connected() {
                    return Err(ConfigureError::new(
                        ErrorCategory::ConnectivityLost,
                        "impossible to connect with the device",
                    ));
                }
                WaitingForInitialStatus
            }

            WaitingForInitialStatus => {
                info!("NetworkConfigure: waiting for initial status from device");
                match self.receive(self.options.initial_status_timeout)? {
                    None => {
                        return Err(ConfigureError::timeout(
                            "no status received from the device, please check the NetworkConfigurator lib is activated in the sketch",
                        ))
                    }
                    Some(Message::ProvisioningStatus(1)) => WaitingForInitialStatus,
                    Some(Message::ProvisioningStatus(status)) if status == -6 || status <= -101 => {
                        handle_status(self.state, status)?
                    }
                    Some(Message::WifiNetworks(networks)) => self.accept_networks(networks),
                    Some(_) => WaitingForNetworkOptions,
                }
            }

            WaitingForNetworkOptions => {
                info!("NetworkConfigure: waiting for network options from device");
                match self.receive(self.options.network_options_timeout)? {
                    None => {
                        return Err(ConfigureError::timeout(
                            "no network options received from the device, please retry enabling the NetworkConfigurator lib in the sketch",
                        ))
                    }
                    Some(Message::WifiNetworks(networks)) => self.accept_networks(networks),
                    Some(Message::ProvisioningStatus(1)) => WaitingForInitialStatus,
                    Some(Message::ProvisioningStatus(status)) => handle_status(self.state, status)?,
                    Some(other) => self.ignore(other),
                }
            }

            BoardReady => ConfigureNetwork,

            ConfigureNetwork => {
                info!("NetworkConfigure: sending network configuration");
                let message = net_config
                    .to_message()
                    .map_err(|e| ConfigureError::new(ErrorCategory::UnsupportedConfig, e.to_string()))?;
                self.engine.send_data(&message)?;
                self.engine.settle(self.options.settle_delay, &self.cancel)?;
                SendConnectionRequest
            }

            SendConnectionRequest => {
                info!("NetworkConfigure: sending connection request");
                self.engine.send_data(&Message::command(BoardCommand::Connect))?;
                WaitingForConnectionCommandResult
            }

            WaitingForConnectionCommandResult => {
                info!("NetworkConfigure: waiting for connection command result");
                match self.receive(self.options.command_result_timeout)? {
                    None => {
                        return Err(ConfigureError::timeout(
                            "no confirmation of connection command received from the device, please retry",
                        ))
                    }
                    Some(Message::ProvisioningStatus(1)) => WaitingForNetworkConfigResult,
                    Some(Message::ProvisioningStatus(-4)) => ConfigureNetwork,
                    Some(Message::ProvisioningStatus(status)) => handle_status(self.state, status)?,
                    Some(other) => self.ignore(other),
                }
            }

            MissingParameter => ConfigureNetwork,

            WaitingForNetworkConfigResult => {
                info!("NetworkConfigure: waiting for network configuration result");
                match self.receive(self.options.connection_result_timeout)? {
                    None => {
                        return Err(ConfigureError::timeout(
                            "no result received from the device for network configuration, please retry",
                        ))
                    }
                    Some(Message::ProvisioningStatus(2)) => End,
                    // Cellular modems report a bad configuration this way.
                    Some(Message::ProvisioningStatus(-3 | -101)) => {
                        return Err(ConfigureError::new(
                            ErrorCategory::InvalidCredentials,
                            "connection failed: invalid network configuration",
                        ))
                    }
                    Some(Message::ProvisioningStatus(status)) => handle_status(self.state, status)?,
                    Some(other) => self.ignore(other),
                }
            }

            End => End,
        };
        Ok(next)
    }

    /// Next message within the current state's budget. Messages that keep
    /// the flow in the same state do not extend it.
    fn receive(&mut self, budget: Duration) -> Result<Option<Message>, ConfigureError> {
        let deadline = *self.state_deadline.get_or_insert_with(|| Instant::now() + budget);
        let remaining = deadline.saturating_duration_since(Instant::now());
        let message = self.engine.receive_data(remaining, &self.cancel)?;
        if message.is_none() && !self.engine.is_connected() {
            return Err(session_closed());
        }
        Ok(message)
    }

    fn accept_networks(&mut self, networks: Vec<WifiNetwork>) -> SessionState {
        debug!("board reported {} networks", networks.len());
        self.networks = networks;
        SessionState::BoardReady
    }

    fn ignore(&self, message: Message) -> SessionState {
        debug!("ignoring {} in {}", message.kind(), self.state);
        self.state
    }
}

/// Error for a board that ended the session while a reply was awaited.
pub(crate) fn session_closed() -> ConfigureError {
    ConfigureError::new(ErrorCategory::ConnectivityLost, "the device closed the session")
}

/// Connect over `transport`, configure the board with `net_config` and
/// release the transport.
pub fn network_configure<T: Transport>(
    transport: T,
    net_config: &NetConfig,
    cancel: &CancelToken,
    options: &ConfigureOptions,
) -> Result<(), ConfigureError> {
    let mut engine = ProtocolEngine::new(transport);
    if let Err(e) = engine.connect() {
        warn!("NetworkConfigure: failed to connect: {}", e);
        return Err(ConfigureError::new(
            ErrorCategory::ConnectivityLost,
            format!("impossible to connect with the device: {}", e),
        ));
    }
    NetworkConfigurator::new(&mut engine, options.clone(), cancel.clone()).run(net_config)
}
