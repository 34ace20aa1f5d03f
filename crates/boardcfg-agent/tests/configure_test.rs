//! End-to-end tests of the NetworkConfigure flow against a scripted board.
//!
//! The board side is a [`MockBoard`] that answers the engine's data messages
//! through a responder closure; wait budgets are shrunk so that every test
//! finishes in well under a second unless it exercises a timeout.

use std::thread;
use std::time::{Duration, Instant};

use boardcfg_agent::{
    frame_message, network_configure, CancelToken, ConfigureOptions, ErrorCategory, MockBoard,
    MockTransport,
};
use boardcfg_protocol::{ControlCode, Frame, FrameType, Message, NetConfig, WifiNetwork};

fn fast_options() -> ConfigureOptions {
    ConfigureOptions {
        initial_status_timeout: Duration::from_secs(2),
        network_options_timeout: Duration::from_secs(2),
        command_result_timeout: Duration::from_secs(2),
        connection_result_timeout: Duration::from_secs(2),
        settle_delay: Duration::from_millis(10),
    }
}

fn wifi_config() -> NetConfig {
    NetConfig::wifi("S", "pw")
}

/// Board that greets with "Connecting" and one scanned network.
fn greeting_board() -> (MockTransport, MockBoard) {
    let (transport, board) = MockTransport::new();
    board.push_message(&Message::ProvisioningStatus(1));
    board.push_message(&Message::WifiNetworks(vec![WifiNetwork::new("S", -40)]));
    (transport, board)
}

fn assert_session_closed(board: &MockBoard) {
    assert!(!board.is_connected(), "transport must be closed");
    assert_eq!(board.close_count(), 1);
}

// ============================================================================
// Successful Configuration
// ============================================================================

#[test]
fn test_wifi_configuration_succeeds() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::WifiConfig(_) => vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(2)],
        _ => vec![],
    });

    let result = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options());
    assert_eq!(result, Ok(()));

    let expected_config = wifi_config().to_message().unwrap();
    assert_eq!(board.sent_messages(), vec![expected_config, Message::Command(1)]);
    assert_session_closed(&board);
}

#[test]
fn test_session_frames_on_the_wire() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(2)],
        _ => vec![],
    });

    network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options()).unwrap();

    let writes = board.writes();
    assert_eq!(writes.first(), Some(&Frame::control(ControlCode::Init).to_bytes()));
    assert_eq!(writes.last(), Some(&Frame::control(ControlCode::End).to_bytes()));

    let connect = hex::decode("55aa020009da000120038101 7e1baa55".replace(' ', "")).unwrap();
    assert!(writes.contains(&connect), "connect command frame not written");
}

#[test]
fn test_scanning_status_before_network_list() {
    let (transport, board) = MockTransport::new();
    board.push_message(&Message::ProvisioningStatus(100));
    board.push_message(&Message::WifiNetworks(vec![WifiNetwork::new("S", -40)]));
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(2)],
        _ => vec![],
    });

    let result = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options());
    assert_eq!(result, Ok(()));
}

#[test]
fn test_informational_status_while_waiting_for_result() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![
            Message::ProvisioningStatus(1),
            Message::ProvisioningStatus(4),
            Message::SketchVersion("1.0.0".into()),
            Message::ProvisioningStatus(2),
        ],
        _ => vec![],
    });

    let result = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options());
    assert_eq!(result, Ok(()));
}

#[test]
fn test_missing_parameters_resends_configuration_once() {
    let (transport, board) = greeting_board();
    let mut connect_requests = 0;
    board.on_message(move |m| match m {
        Message::Command(1) => {
            connect_requests += 1;
            if connect_requests == 1 {
                vec![Message::ProvisioningStatus(-4)]
            } else {
                vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(2)]
            }
        }
        _ => vec![],
    });

    let result = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options());
    assert_eq!(result, Ok(()));

    let config = wifi_config().to_message().unwrap();
    assert_eq!(
        board.sent_messages(),
        vec![config.clone(), Message::Command(1), config, Message::Command(1)]
    );
}

#[test]
fn test_nacked_configuration_is_resent_before_connect() {
    let (transport, board) = greeting_board();
    let mut nacked = false;
    board.on_write(move |bytes| {
        let frame = match Frame::decode(bytes) {
            Ok(frame) if frame.frame_type() == Some(FrameType::Data) => frame,
            _ => return vec![],
        };
        match Message::decode(frame.payload()) {
            Ok(Message::WifiConfig(_)) if !nacked => {
                nacked = true;
                vec![Frame::control(ControlCode::Nack).to_bytes()]
            }
            Ok(Message::Command(1)) => vec![
                frame_message(&Message::ProvisioningStatus(1)),
                frame_message(&Message::ProvisioningStatus(2)),
            ],
            _ => vec![],
        }
    });
    let options = ConfigureOptions {
        settle_delay: Duration::from_millis(50),
        ..fast_options()
    };

    let result = network_configure(transport, &wifi_config(), &CancelToken::new(), &options);
    assert_eq!(result, Ok(()));

    let config = wifi_config().to_message().unwrap();
    assert_eq!(
        board.sent_messages(),
        vec![config.clone(), config, Message::Command(1)]
    );
}

// ============================================================================
// Terminal Errors
// ============================================================================

#[test]
fn test_failed_connection_is_invalid_credentials() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(-1)],
        _ => vec![],
    });

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidCredentials);
    assert_session_closed(&board);
}

#[test]
fn test_cellular_disconnect_is_invalid_configuration() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1), Message::ProvisioningStatus(-3)],
        _ => vec![],
    });

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidCredentials);
    assert_eq!(err.message, "connection failed: invalid network configuration");
}

#[test]
fn test_busy_board_during_initial_status() {
    let (transport, board) = MockTransport::new();
    board.push_message(&Message::ProvisioningStatus(-6));

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Busy);
    assert!(board.sent_messages().is_empty());
    assert_session_closed(&board);
}

#[test]
fn test_hardware_error_during_network_options() {
    let (transport, board) = MockTransport::new();
    board.push_message(&Message::ProvisioningStatus(0));
    board.push_message(&Message::ProvisioningStatus(-150));

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::HardwareError);
}

#[test]
fn test_unknown_network_type_is_unsupported() {
    let (transport, board) = greeting_board();
    let config = NetConfig {
        kind: 9,
        ..Default::default()
    };

    let err = network_configure(transport, &config, &CancelToken::new(), &fast_options()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedConfig);
    assert!(board.sent_messages().is_empty());
    assert_session_closed(&board);
}

#[test]
fn test_unreachable_board_is_connectivity_lost() {
    let (transport, board) = MockTransport::new();
    board.refuse_connect(true);

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ConnectivityLost);
    assert!(err.message.starts_with("impossible to connect with the device"));
    assert!(err.message.contains("port busy"), "cause missing: {}", err.message);
    assert!(board.writes().is_empty());
}

#[test]
fn test_board_ending_session_is_connectivity_lost() {
    let (transport, board) = greeting_board();
    board.on_write(|bytes| {
        if bytes == Frame::control(ControlCode::Init).to_bytes().as_slice() {
            return vec![];
        }
        vec![Frame::control(ControlCode::End).to_bytes()]
    });

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &fast_options())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ConnectivityLost);
    assert!(!board.is_connected());
}

// ============================================================================
// Timeouts and Cancellation
// ============================================================================

#[test]
fn test_silent_board_times_out() {
    let (transport, board) = MockTransport::new();
    let options = ConfigureOptions {
        initial_status_timeout: Duration::from_millis(100),
        ..fast_options()
    };

    let started = Instant::now();
    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &options).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_session_closed(&board);
}

#[test]
fn test_no_connection_result_times_out() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1)],
        _ => vec![],
    });
    let options = ConfigureOptions {
        connection_result_timeout: Duration::from_millis(100),
        ..fast_options()
    };

    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &options).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert!(err.message.contains("no result received"));
}

#[test]
fn test_repeated_status_does_not_extend_wait() {
    let (transport, board) = greeting_board();
    board.on_message(|m| match m {
        Message::Command(1) => vec![Message::ProvisioningStatus(1)],
        _ => vec![],
    });
    let options = ConfigureOptions {
        connection_result_timeout: Duration::from_millis(300),
        ..fast_options()
    };

    let chatter = board.clone();
    let spammer = thread::spawn(move || {
        for _ in 0..40 {
            if chatter.sent_messages().contains(&Message::Command(1)) && chatter.is_connected() {
                chatter.push_message(&Message::ProvisioningStatus(4));
            }
            thread::sleep(Duration::from_millis(50));
        }
    });

    let started = Instant::now();
    let err = network_configure(transport, &wifi_config(), &CancelToken::new(), &options).unwrap_err();
    let elapsed = started.elapsed();
    spammer.join().unwrap();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert!(err.message.contains("no result received"));
    assert!(elapsed < Duration::from_millis(1500), "wait was extended: {:?}", elapsed);
}

#[test]
fn test_cancellation_during_wait() {
    let (transport, board) = MockTransport::new();
    let options = ConfigureOptions {
        initial_status_timeout: Duration::from_secs(30),
        ..fast_options()
    };
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.cancel();
    });

    let started = Instant::now();
    let err = network_configure(transport, &wifi_config(), &cancel, &options).unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err.category(), ErrorCategory::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_session_closed(&board);
}

#[test]
fn test_cancellation_during_settle_delay() {
    let (transport, board) = greeting_board();
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    board.on_message(move |m| {
        if let Message::WifiConfig(_) = m {
            handle.cancel();
        }
        vec![]
    });
    let options = ConfigureOptions {
        settle_delay: Duration::from_secs(30),
        ..fast_options()
    };

    let err = network_configure(transport, &wifi_config(), &cancel, &options).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Cancelled);
    assert_eq!(board.sent_messages(), vec![wifi_config().to_message().unwrap()]);
    assert_session_closed(&board);
}
