//! Protocol constants
//!
//! Wire-level values shared by the frame codec and the message catalogue.

// ============================================================================
// Frame Layout
// ============================================================================

/// First byte of the start-of-frame marker.
pub const FRAME_START_0: u8 = 0x55;
/// Second byte of the start-of-frame marker.
pub const FRAME_START_1: u8 = 0xAA;
/// Start-of-frame marker as it appears on the wire.
pub const FRAME_START: [u8; 2] = [FRAME_START_0, FRAME_START_1];
/// End-of-frame marker as it appears on the wire.
pub const FRAME_END: [u8; 2] = [0xAA, 0x55];

/// Start marker, type byte and the two length bytes.
pub const FRAME_HEADER_LEN: usize = 5;
/// Big-endian CRC-16 after the payload.
pub const FRAME_CRC_LEN: usize = 2;
/// End marker.
pub const FRAME_FOOTER_LEN: usize = 2;
/// Bytes a frame carries in addition to its payload.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_LEN + FRAME_CRC_LEN + FRAME_FOOTER_LEN;

/// Largest payload whose length field (`len + 2`) still fits in a u16.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - FRAME_CRC_LEN;

// ============================================================================
// Frame Types
// ============================================================================

/// Command addressed to the device (legacy command channel).
pub const FRAME_TYPE_CMD: u8 = 0x01;
/// CBOR encoded message.
pub const FRAME_TYPE_DATA: u8 = 0x02;
/// Session control (init, end, nack). Also called "response".
pub const FRAME_TYPE_TRANSMISSION_CONTROL: u8 = 0x03;

// ============================================================================
// Transmission Control Payloads
// ============================================================================

/// Opens a session; sent by the host right after the port is opened.
pub const CONTROL_INIT: u8 = 0x01;
/// Closes a session; may be sent by either side.
pub const CONTROL_END: u8 = 0x02;
/// Requests retransmission of the peer's last data frame.
pub const CONTROL_NACK: u8 = 0x03;

// ============================================================================
// CBOR Message Tags
// ============================================================================

/// Board status report.
pub const TAG_PROVISIONING_STATUS: u64 = 0x012000;
/// List of WiFi networks seen by the board.
pub const TAG_WIFI_NETWORKS: u64 = 0x012001;
/// Unix timestamp handed to the board.
pub const TAG_TIMESTAMP: u64 = 0x012002;
/// Single-byte command.
pub const TAG_COMMAND: u64 = 0x012003;
pub const TAG_WIFI_CONFIG: u64 = 0x012004;
pub const TAG_LORA_CONFIG: u64 = 0x012005;
pub const TAG_GSM_CONFIG: u64 = 0x012006;
pub const TAG_NB_CONFIG: u64 = 0x012007;
pub const TAG_CATM1_CONFIG: u64 = 0x012008;
pub const TAG_ETHERNET_CONFIG: u64 = 0x012009;
/// 32 byte hardware identifier.
pub const TAG_UNIQUE_ID: u64 = 0x012010;
/// 268 byte identifier signature.
pub const TAG_SIGNATURE: u64 = 0x012011;
pub const TAG_CELLULAR_CONFIG: u64 = 0x012012;
pub const TAG_BLE_MAC_ADDRESS: u64 = 0x012013;
pub const TAG_WIFI_FW_VERSION: u64 = 0x012014;
pub const TAG_SKETCH_VERSION: u64 = 0x012015;
pub const TAG_NETCONFIG_LIB_VERSION: u64 = 0x012016;
/// PEM encoded public key.
pub const TAG_PUBLIC_KEY: u64 = 0x012017;

/// Literal prefix of an encoded WiFi network list (tag 0x012001 in its
/// four-byte argument form).
pub const WIFI_NETWORKS_PREFIX: [u8; 5] = [0xDA, 0x00, 0x01, 0x20, 0x01];

// ============================================================================
// Field Sizes
// ============================================================================

pub const UNIQUE_ID_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 268;
pub const BLE_MAC_LEN: usize = 6;
/// CAT-M1 band bitmap words.
pub const MAX_CATM1_BAND_WORDS: usize = 4;
