//! Frame encoding and validation.
//!
//! Every unit on the wire is a self-delimiting frame:
//!
//! ```text
//! +-------+-------+------+-----------+-----------+---------+--------+-------+-------+
//! | 0x55  | 0xAA  | type | len (BE)  | payload   | crc     | crc    | 0xAA  | 0x55  |
//! |       |       |      | = N + 2   | N bytes   | hi      | lo     |       |       |
//! +-------+-------+------+-----------+-----------+---------+--------+-------+-------+
//! ```
//!
//! The CRC covers the payload only. A frame is valid when both markers
//! match, the length field is consistent with the payload, the payload is
//! not empty and the CRC matches.

use std::fmt;

use bytes::{BufMut, Bytes};

use crate::constants::*;
use crate::crc::crc16;
use crate::error::{ProtocolError, ProtocolResult};

/// Frame type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Legacy command to the device.
    Cmd,
    /// CBOR message.
    Data,
    /// Session control byte (init, end, nack).
    TransmissionControl,
}

impl FrameType {
    /// Wire value of this type.
    pub fn code(self) -> u8 {
        match self {
            FrameType::Cmd => FRAME_TYPE_CMD,
            FrameType::Data => FRAME_TYPE_DATA,
            FrameType::TransmissionControl => FRAME_TYPE_TRANSMISSION_CONTROL,
        }
    }

    /// Parse a wire value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            FRAME_TYPE_CMD => Some(FrameType::Cmd),
            FRAME_TYPE_DATA => Some(FrameType::Data),
            FRAME_TYPE_TRANSMISSION_CONTROL => Some(FrameType::TransmissionControl),
            _ => None,
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FrameType::from_code(code).ok_or(ProtocolError::UnknownFrameType(code))
    }
}

/// Payload of a transmission control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    Init,
    End,
    Nack,
}

impl ControlCode {
    pub fn code(self) -> u8 {
        match self {
            ControlCode::Init => CONTROL_INIT,
            ControlCode::End => CONTROL_END,
            ControlCode::Nack => CONTROL_NACK,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CONTROL_INIT => Some(ControlCode::Init),
            CONTROL_END => Some(ControlCode::End),
            CONTROL_NACK => Some(ControlCode::Nack),
            _ => None,
        }
    }
}

/// A frame as it was built or as it arrived.
///
/// Frames produced by the reassembler keep the bytes they were received
/// with, so an invalid frame still exposes what went wrong through
/// [`Frame::validate`].
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    start: [u8; 2],
    frame_type: u8,
    length_field: u16,
    payload: Bytes,
    crc: u16,
    end: [u8; 2],
}

impl Frame {
    /// Build a frame around `payload`, computing length and CRC.
    pub fn new(frame_type: FrameType, payload: &[u8]) -> ProtocolResult<Self> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        Ok(Frame {
            start: FRAME_START,
            frame_type: frame_type.code(),
            length_field: (payload.len() + FRAME_CRC_LEN) as u16,
            payload: Bytes::copy_from_slice(payload),
            crc: crc16(payload),
            end: FRAME_END,
        })
    }

    /// Build a data frame carrying an encoded message.
    pub fn data(payload: &[u8]) -> ProtocolResult<Self> {
        Frame::new(FrameType::Data, payload)
    }

    /// Build a single-byte transmission control frame.
    pub fn control(code: ControlCode) -> Self {
        let payload = [code.code()];
        Frame {
            start: FRAME_START,
            frame_type: FRAME_TYPE_TRANSMISSION_CONTROL,
            length_field: (payload.len() + FRAME_CRC_LEN) as u16,
            payload: Bytes::copy_from_slice(&payload),
            crc: crc16(&payload),
            end: FRAME_END,
        }
    }

    /// Split a complete on-wire frame into its fields without validating it.
    ///
    /// `raw` must hold exactly one frame whose length field is already known
    /// to match `raw.len()`.
    pub(crate) fn from_raw(raw: Bytes) -> Self {
        let payload_end = raw.len() - FRAME_CRC_LEN - FRAME_FOOTER_LEN;
        let crc_at = payload_end;
        let end_at = payload_end + FRAME_CRC_LEN;
        Frame {
            start: [raw[0], raw[1]],
            frame_type: raw[2],
            length_field: u16::from_be_bytes([raw[3], raw[4]]),
            crc: u16::from_be_bytes([raw[crc_at], raw[crc_at + 1]]),
            end: [raw[end_at], raw[end_at + 1]],
            payload: raw.slice(FRAME_HEADER_LEN..payload_end),
        }
    }

    /// Parse and validate exactly one frame.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(ProtocolError::InvalidFrame(format!(
                "need at least {} bytes, got {}",
                FRAME_OVERHEAD,
                bytes.len()
            )));
        }
        let length_field = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
        let expected = length_field + FRAME_HEADER_LEN + FRAME_FOOTER_LEN;
        if length_field < FRAME_CRC_LEN || expected != bytes.len() {
            return Err(ProtocolError::InvalidFrame(format!(
                "length field {} does not match frame size {}",
                length_field,
                bytes.len()
            )));
        }
        let frame = Frame::from_raw(Bytes::copy_from_slice(bytes));
        frame.validate()?;
        Ok(frame)
    }

    /// Check markers, length and CRC.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.start != FRAME_START {
            return Err(ProtocolError::InvalidFrame(format!(
                "bad start marker {:02X} {:02X}",
                self.start[0], self.start[1]
            )));
        }
        if self.end != FRAME_END {
            return Err(ProtocolError::InvalidFrame(format!(
                "bad end marker {:02X} {:02X}",
                self.end[0], self.end[1]
            )));
        }
        if self.payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        if self.length_field as usize != self.payload.len() + FRAME_CRC_LEN {
            return Err(ProtocolError::InvalidFrame(format!(
                "length field {} for {} payload bytes",
                self.length_field,
                self.payload.len()
            )));
        }
        let computed = crc16(&self.payload);
        if computed != self.crc {
            return Err(ProtocolError::InvalidFrame(format!(
                "crc mismatch: received 0x{:04X}, computed 0x{:04X}",
                self.crc, computed
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Parsed frame type, if the type byte is known.
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_code(self.frame_type)
    }

    /// Raw type byte.
    pub fn type_code(&self) -> u8 {
        self.frame_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Transmitted CRC.
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Control code of a single-byte transmission control frame.
    pub fn control_code(&self) -> Option<ControlCode> {
        match (self.frame_type(), self.payload.as_ref()) {
            (Some(FrameType::TransmissionControl), [code]) => ControlCode::from_code(*code),
            _ => None,
        }
    }

    /// Size of the frame on the wire.
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    /// Serialise the frame exactly as stored.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_slice(&self.start);
        buf.put_u8(self.frame_type);
        buf.put_u16(self.length_field);
        buf.put_slice(&self.payload);
        buf.put_u16(self.crc);
        buf.put_slice(&self.end);
        buf
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("type", &self.frame_type)
            .field("len", &self.payload.len())
            .field("crc", &format_args!("0x{:04X}", self.crc))
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Frame `payload` as `frame_type` and return the wire bytes.
pub fn encode_frame(frame_type: FrameType, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    Ok(Frame::new(frame_type, payload)?.to_bytes())
}
