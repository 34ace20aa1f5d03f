//! Board status codes and command codes.

use std::fmt;

/// Status reported by the board in a `ProvisioningStatus` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Connecting,
    Connected,
    Reset,
    ScanningNetworks,
    FailedToConnect,
    Disconnected,
    ParametersNotProvided,
    InvalidParameters,
    /// A request is already pending on the board.
    Busy,
    InvalidRequest,
    InternetNotAvailable,
    HwConnectivityError,
    HwConnectivityStopped,
    SecureElementInitError,
    SecureElementConfigError,
    SecureElementLockError,
    UhwidError,
    StorageBeginError,
    StoragePartitionError,
    GenericError,
    /// Any code outside the known table.
    Other(i16),
}

impl StatusCode {
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => StatusCode::Connecting,
            2 => StatusCode::Connected,
            4 => StatusCode::Reset,
            100 => StatusCode::ScanningNetworks,
            -1 => StatusCode::FailedToConnect,
            -3 => StatusCode::Disconnected,
            -4 => StatusCode::ParametersNotProvided,
            -5 => StatusCode::InvalidParameters,
            -6 => StatusCode::Busy,
            -7 => StatusCode::InvalidRequest,
            -8 => StatusCode::InternetNotAvailable,
            -101 => StatusCode::HwConnectivityError,
            -102 => StatusCode::HwConnectivityStopped,
            -150 => StatusCode::SecureElementInitError,
            -151 => StatusCode::SecureElementConfigError,
            -152 => StatusCode::SecureElementLockError,
            -160 => StatusCode::UhwidError,
            -200 => StatusCode::StorageBeginError,
            -201 => StatusCode::StoragePartitionError,
            -255 => StatusCode::GenericError,
            other => StatusCode::Other(other),
        }
    }

    pub fn code(self) -> i16 {
        match self {
            StatusCode::Connecting => 1,
            StatusCode::Connected => 2,
            StatusCode::Reset => 4,
            StatusCode::ScanningNetworks => 100,
            StatusCode::FailedToConnect => -1,
            StatusCode::Disconnected => -3,
            StatusCode::ParametersNotProvided => -4,
            StatusCode::InvalidParameters => -5,
            StatusCode::Busy => -6,
            StatusCode::InvalidRequest => -7,
            StatusCode::InternetNotAvailable => -8,
            StatusCode::HwConnectivityError => -101,
            StatusCode::HwConnectivityStopped => -102,
            StatusCode::SecureElementInitError => -150,
            StatusCode::SecureElementConfigError => -151,
            StatusCode::SecureElementLockError => -152,
            StatusCode::UhwidError => -160,
            StatusCode::StorageBeginError => -200,
            StatusCode::StoragePartitionError => -201,
            StatusCode::GenericError => -255,
            StatusCode::Other(code) => code,
        }
    }

    /// Short description as the board firmware names the status.
    pub fn description(self) -> &'static str {
        match self {
            StatusCode::Connecting => "connecting",
            StatusCode::Connected => "connected",
            StatusCode::Reset => "reset",
            StatusCode::ScanningNetworks => "scanning for WiFi networks",
            StatusCode::FailedToConnect => "failed to connect",
            StatusCode::Disconnected => "disconnected",
            StatusCode::ParametersNotProvided => "parameters not provided",
            StatusCode::InvalidParameters => "invalid parameters",
            StatusCode::Busy => "cannot execute a new request while another is pending",
            StatusCode::InvalidRequest => "invalid request",
            StatusCode::InternetNotAvailable => "internet not available",
            StatusCode::HwConnectivityError => "hardware error in connectivity module",
            StatusCode::HwConnectivityStopped => "hardware connectivity module stopped",
            StatusCode::SecureElementInitError => "error initializing secure element",
            StatusCode::SecureElementConfigError => "error configuring secure element",
            StatusCode::SecureElementLockError => "error locking secure element",
            StatusCode::UhwidError => "error generating UHWID",
            StatusCode::StorageBeginError => "error beginning storage module",
            StatusCode::StoragePartitionError => "failed to partition the storage",
            StatusCode::GenericError => "generic error",
            StatusCode::Other(_) => "unknown status",
        }
    }

    /// Negative codes report a failure on the board side.
    pub fn is_error(self) -> bool {
        self.code() < 0
    }
}

impl From<i16> for StatusCode {
    fn from(code: i16) -> Self {
        StatusCode::from_code(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Command byte carried by a `Command` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardCommand {
    /// Apply the configuration sent so far and connect.
    Connect,
    /// Request the unique id, signature and public key.
    GetId,
    GetBleMac,
    /// Wipe stored network credentials.
    Reset,
    ScanWifi,
    GetWifiFwVersion,
    GetSketchVersion,
    GetNetConfigLibVersion,
}

impl BoardCommand {
    pub fn code(self) -> u8 {
        match self {
            BoardCommand::Connect => 1,
            BoardCommand::GetId => 2,
            BoardCommand::GetBleMac => 3,
            BoardCommand::Reset => 4,
            BoardCommand::ScanWifi => 100,
            BoardCommand::GetWifiFwVersion => 101,
            BoardCommand::GetSketchVersion => 200,
            BoardCommand::GetNetConfigLibVersion => 201,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(BoardCommand::Connect),
            2 => Some(BoardCommand::GetId),
            3 => Some(BoardCommand::GetBleMac),
            4 => Some(BoardCommand::Reset),
            100 => Some(BoardCommand::ScanWifi),
            101 => Some(BoardCommand::GetWifiFwVersion),
            200 => Some(BoardCommand::GetSketchVersion),
            201 => Some(BoardCommand::GetNetConfigLibVersion),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_known_codes() {
        for code in [1, 2, 4, 100, -1, -3, -4, -5, -6, -7, -8, -101, -102, -150, -151, -152, -160, -200, -201, -255] {
            let status = StatusCode::from_code(code);
            assert!(!matches!(status, StatusCode::Other(_)), "code {} unmapped", code);
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_unknown_status_preserved() {
        let status = StatusCode::from(-42);
        assert_eq!(status, StatusCode::Other(-42));
        assert_eq!(status.code(), -42);
        assert!(status.is_error());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StatusCode::Busy.to_string(), "cannot execute a new request while another is pending (-6)");
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(BoardCommand::Connect.code(), 1);
        assert_eq!(BoardCommand::GetNetConfigLibVersion.code(), 201);
        assert_eq!(BoardCommand::from_code(100), Some(BoardCommand::ScanWifi));
        assert_eq!(BoardCommand::from_code(5), None);
    }
}
