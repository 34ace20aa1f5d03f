//! WiFi network list.
//!
//! The board reports scan results as the five-byte tag prefix
//! `DA 00 01 20 01` followed by a flat CBOR array alternating SSID text
//! strings and RSSI negative integers:
//!
//! ```text
//! DA 00 01 20 01  84  65 "SSID1"  38 4B  65 "SSID2"  38 37
//!                 |   |           |
//!                 |   |           +-- negint: -1 - 0x4B = -76
//!                 |   +-- text(5)
//!                 +-- array(4)
//! ```
//!
//! The list is parsed by hand instead of through the generic message
//! decoder; anything that is not a text/negint pair is rejected.

use std::convert::Infallible;

use log::trace;
use minicbor::data::Tag;
use minicbor::Encoder;

use crate::constants::{TAG_WIFI_NETWORKS, WIFI_NETWORKS_PREFIX};
use crate::error::{ProtocolError, ProtocolResult};

const MAJOR_NEGINT: u8 = 1;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;

/// One scan result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WifiNetwork {
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
}

impl WifiNetwork {
    pub fn new(ssid: impl Into<String>, rssi: i32) -> Self {
        WifiNetwork {
            ssid: ssid.into(),
            rssi,
        }
    }
}

/// Decode the list that follows the `DA 00 01 20 01` prefix.
///
/// Consecutive arrays are concatenated. A body without any array is
/// malformed; an empty array is an empty list.
pub fn decode_networks(body: &[u8]) -> ProtocolResult<Vec<WifiNetwork>> {
    if body.is_empty() {
        return Err(ProtocolError::MalformedMessage(
            "empty network list body".to_string(),
        ));
    }
    let mut reader = HeadReader { data: body, pos: 0 };
    let mut networks = Vec::new();

    while !reader.is_empty() {
        let len = reader.head(MAJOR_ARRAY)?;
        if len % 2 != 0 {
            return Err(invalid(format!("odd element count {}", len)));
        }
        for _ in 0..len / 2 {
            let ssid_len = reader.head(MAJOR_TEXT)?;
            let ssid = std::str::from_utf8(reader.take(ssid_len)?)
                .map_err(|_| invalid("SSID is not valid UTF-8".to_string()))?
                .to_string();
            let magnitude = reader.head(MAJOR_NEGINT)?;
            let rssi = i32::try_from(magnitude)
                .map(|m| -1 - m)
                .map_err(|_| invalid(format!("RSSI magnitude {} out of range", magnitude)))?;
            networks.push(WifiNetwork { ssid, rssi });
        }
    }

    trace!("decoded {} networks", networks.len());
    Ok(networks)
}

/// Encode a list the way the board sends it, prefix included.
pub fn encode_networks(networks: &[WifiNetwork]) -> ProtocolResult<Vec<u8>> {
    if let Some(bad) = networks.iter().find(|n| n.rssi >= 0) {
        return Err(ProtocolError::InvalidField {
            field: "rssi",
            reason: format!("{} is not negative", bad.rssi),
        });
    }

    let mut e = Encoder::new(Vec::new());
    e.tag(Tag::new(TAG_WIFI_NETWORKS))
        .and_then(|e| write_network_pairs(e, networks))
        .map_err(|err| ProtocolError::Encode(err.to_string()))?;

    let bytes = e.into_writer();
    debug_assert!(bytes.starts_with(&WIFI_NETWORKS_PREFIX));
    Ok(bytes)
}

/// Write the flat SSID/RSSI array that follows the tag.
pub(crate) fn write_network_pairs(
    e: &mut Encoder<Vec<u8>>,
    networks: &[WifiNetwork],
) -> Result<(), minicbor::encode::Error<Infallible>> {
    e.array(networks.len() as u64 * 2)?;
    for network in networks {
        e.str(&network.ssid)?.i32(network.rssi)?;
    }
    Ok(())
}

fn invalid(reason: String) -> ProtocolError {
    ProtocolError::InvalidData(reason)
}

/// Minimal reader for CBOR item heads.
struct HeadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> HeadReader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: u64) -> ProtocolResult<&'a [u8]> {
        let len = usize::try_from(len).map_err(|_| invalid(format!("length {} too large", len)))?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| invalid(format!("truncated at offset {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read an item head of the given major type and return its argument.
    fn head(&mut self, major: u8) -> ProtocolResult<u64> {
        let initial = self.take(1)?[0];
        if initial >> 5 != major {
            return Err(invalid(format!(
                "expected major type {} at offset {}, found 0x{:02X}",
                major,
                self.pos - 1,
                initial
            )));
        }
        let argument = match initial & 0x1F {
            info @ 0..=23 => u64::from(info),
            24 => u64::from(self.take(1)?[0]),
            25 => {
                let b = self.take(2)?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4)?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let b = self.take(8)?;
                u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            other => return Err(invalid(format!("unsupported additional info {}", other))),
        };
        Ok(argument)
    }
}
