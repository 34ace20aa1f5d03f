//! Arduino Board Configuration Agent
//!
//! Host side of the board configuration protocol: byte transports, the
//! protocol engine that turns frames into messages, and the flows built on
//! top of it.
//!
//! # Layers
//!
//! - **Transport**: [`Transport`] moves raw bytes. [`SerialTransport`] talks
//!   to a USB serial port at 9600 8N1; [`MockTransport`] is an in-memory link
//!   driven by a [`MockBoard`].
//! - **Engine**: [`ProtocolEngine`] owns the transport and a frame
//!   reassembler, answers corrupted frames with a NACK, retransmits its last
//!   data frame when the board asks, and hands decoded messages to callers.
//! - **Flows**: [`network_configure`] runs the NetworkConfigure state machine;
//!   [`BoardQuery`] asks for versions, MAC address, identity and scans.
//!
//! Every blocking wait polls a [`CancelToken`].
//!
//! # Example
//!
//! ```rust,ignore
//! use boardcfg_agent::{network_configure, CancelToken, ConfigureOptions, SerialParams, SerialTransport};
//! use boardcfg_protocol::NetConfig;
//!
//! let transport = SerialTransport::new(SerialParams::new("/dev/ttyACM0"));
//! let config = NetConfig::wifi("home", "secret");
//! network_configure(transport, &config, &CancelToken::new(), &ConfigureOptions::default())?;
//! ```

mod board_info;
mod cancel;
mod configure;
mod engine;
mod error;
mod mock;
mod serial;
mod transport;
mod version;

pub use board_info::*;
pub use cancel::*;
pub use configure::*;
pub use engine::*;
pub use error::*;
pub use mock::*;
pub use serial::*;
pub use transport::*;
pub use version::*;
