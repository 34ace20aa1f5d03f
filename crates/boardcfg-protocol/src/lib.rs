//! Arduino Board Configuration Protocol
//!
//! Wire format and message catalogue used to configure the network
//! connectivity of an Arduino board over a serial line.
//!
//! # Protocol Overview
//!
//! Bytes are grouped into CRC-16 protected [`Frame`]s. Three frame types
//! are in use:
//!
//! - **Data** (0x02): one CBOR [`Message`], a tagged array whose tag picks
//!   the variant
//! - **Transmission control** (0x03): a single [`ControlCode`] byte opening
//!   or closing a session or asking the peer to resend its last data frame
//! - **Cmd** (0x01): legacy command channel, framed but not interpreted here
//!
//! Inbound bytes go through a [`FrameReassembler`], which copes with
//! fragmentation, junk between frames and start markers split across reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use boardcfg_protocol::{Frame, FrameReassembler, Message, NetConfig};
//!
//! // Frame the configuration for a WiFi network
//! let message = NetConfig::wifi("home", "secret").to_message()?;
//! let bytes = Frame::data(&message.encode()?)?.to_bytes();
//!
//! // Decode whatever the board sends back
//! let mut reassembler = FrameReassembler::new();
//! for frame in reassembler.feed(&received) {
//!     if frame.is_valid() {
//!         let reply = Message::decode(frame.payload())?;
//!     }
//! }
//! ```

mod constants;
mod crc;
mod error;
mod frame;
mod message;
mod netconfig;
mod reassembler;
mod status;
mod wifi;

pub use constants::*;
pub use crc::crc16;
pub use error::*;
pub use frame::*;
pub use message::*;
pub use netconfig::*;
pub use reassembler::*;
pub use status::*;
pub use wifi::{decode_networks, encode_networks, WifiNetwork};
