//! Stream reassembly.
//!
//! Serial reads arrive in arbitrary chunks: a frame may be spread over many
//! reads, one read may carry several frames, and boot banners or line noise
//! may sit between them. [`FrameReassembler`] turns that stream back into
//! frames.

use bytes::{Buf, Bytes, BytesMut};
use log::{debug, trace};

use crate::constants::*;
use crate::frame::{Frame, FrameType};

/// Initial buffer capacity; large enough for every message in the catalogue.
const INITIAL_CAPACITY: usize = 512;

/// Stateful decoder for one inbound byte stream.
///
/// Completed frames are returned whether or not they validate so that the
/// caller can answer an invalid one with a NACK. Incomplete frames stay
/// buffered across calls to [`feed`](Self::feed) until the rest arrives or
/// [`reset`](Self::reset) is called.
///
/// A header with an unknown type byte or an impossible length abandons the
/// frame immediately and scanning restarts one byte after its start marker.
/// A completed frame whose end marker is wrong is surfaced as invalid and
/// scanning then restarts inside it, so a sender that was cut off mid-frame
/// does not take the following frames down with it.
#[derive(Debug)]
pub struct FrameReassembler {
    /// Bytes of the frame in progress, starting with its start marker.
    /// Outside a frame this holds at most a trailing `0x55`.
    partial: BytesMut,
    /// Payload length announced by the header of the frame in progress.
    expected_payload_len: Option<usize>,
    /// The last chunk ended on the first byte of a start marker.
    pending_start_byte: bool,
    /// A start marker has been seen and its frame is not complete yet.
    inside_frame: bool,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    pub fn new() -> Self {
        FrameReassembler {
            partial: BytesMut::with_capacity(INITIAL_CAPACITY),
            expected_payload_len: None,
            pending_start_byte: false,
            inside_frame: false,
        }
    }

    /// Feed one chunk and collect every frame it completes.
    ///
    /// Once a header is accepted its declared length is trusted: a `55 AA`
    /// inside the frame body does not restart the frame, since payloads may
    /// legitimately contain it. A truncated frame announcing a long payload
    /// therefore holds back the frames behind it until enough bytes have
    /// arrived to find its end marker missing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if chunk.is_empty() {
            return frames;
        }

        if self.pending_start_byte && chunk[0] != FRAME_START_1 {
            // The held 0x55 was not the start of a marker after all.
            self.partial.clear();
        }
        self.pending_start_byte = false;
        self.partial.extend_from_slice(chunk);

        loop {
            if !self.inside_frame && !self.seek_start() {
                break;
            }
            if self.partial.len() < FRAME_HEADER_LEN {
                break;
            }

            let payload_len = match self.expected_payload_len {
                Some(len) => len,
                None => match self.read_header() {
                    Some(len) => {
                        self.expected_payload_len = Some(len);
                        len
                    }
                    None => {
                        self.abandon_frame();
                        continue;
                    }
                },
            };

            let total = payload_len + FRAME_OVERHEAD;
            if self.partial.len() < total {
                break;
            }

            if self.partial[total - FRAME_FOOTER_LEN..total] != FRAME_END {
                debug!("frame without end marker, resynchronising");
                let raw = Bytes::copy_from_slice(&self.partial[..total]);
                frames.push(Frame::from_raw(raw));
                self.abandon_frame();
                continue;
            }

            let frame = Frame::from_raw(self.partial.split_to(total).freeze());
            self.inside_frame = false;
            self.expected_payload_len = None;
            trace!("reassembled {:?}", frame);
            frames.push(frame);
        }

        frames
    }

    /// Drop all buffered state.
    pub fn reset(&mut self) {
        self.partial.clear();
        self.expected_payload_len = None;
        self.pending_start_byte = false;
        self.inside_frame = false;
    }

    /// Number of bytes held for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.partial.len()
    }

    /// A frame has started but not completed.
    pub fn is_inside_frame(&self) -> bool {
        self.inside_frame
    }

    /// Payload length announced by the current header, once it is complete.
    pub fn expected_payload_len(&self) -> Option<usize> {
        self.expected_payload_len
    }

    /// The last chunk ended on a lone `0x55`.
    pub fn has_pending_start_byte(&self) -> bool {
        self.pending_start_byte
    }

    /// Discard bytes up to the next start marker. Returns `false` when none
    /// is buffered, keeping a trailing `0x55` for the next chunk.
    fn seek_start(&mut self) -> bool {
        match self.partial.windows(2).position(|w| w == FRAME_START) {
            Some(pos) => {
                if pos > 0 {
                    trace!("discarding {} bytes before start marker", pos);
                }
                self.partial.advance(pos);
                self.inside_frame = true;
                true
            }
            None => {
                let keep_last = self.partial.last() == Some(&FRAME_START_0);
                let drop = self.partial.len() - usize::from(keep_last);
                if drop > 0 {
                    trace!("discarding {} bytes without start marker", drop);
                }
                self.partial.advance(drop);
                self.pending_start_byte = keep_last;
                false
            }
        }
    }

    /// Payload length from a complete header, or `None` if the header cannot
    /// belong to a real frame.
    fn read_header(&self) -> Option<usize> {
        let frame_type = self.partial[2];
        if FrameType::from_code(frame_type).is_none() {
            debug!("unknown frame type 0x{:02X} in header", frame_type);
            return None;
        }
        let length_field = u16::from_be_bytes([self.partial[3], self.partial[4]]) as usize;
        if length_field <= FRAME_CRC_LEN {
            debug!("length field {} leaves no payload", length_field);
            return None;
        }
        Some(length_field - FRAME_CRC_LEN)
    }

    /// Give up on the frame in progress and rescan from the byte after its
    /// start marker.
    fn abandon_frame(&mut self) {
        self.partial.advance(1);
        self.inside_frame = false;
        self.expected_payload_len = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn data_frame(payload: &[u8]) -> Vec<u8> {
        encode_frame(FrameType::Data, payload).unwrap()
    }

    fn payloads(frames: &[Frame]) -> Vec<Vec<u8>> {
        frames.iter().map(|f| f.payload().to_vec()).collect()
    }

    #[test]
    fn test_single_frame_single_read() {
        let mut reassembler = FrameReassembler::new();
        let frames = reassembler.feed(&data_frame(&[0x04]));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_valid());
        assert_eq!(frames[0].payload(), &[0x04]);
        assert_eq!(reassembler.buffered_len(), 0);
        assert!(!reassembler.is_inside_frame());
    }

    #[test]
    fn test_frame_across_tiny_reads() {
        let mut reassembler = FrameReassembler::new();
        let bytes = data_frame(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        let mut frames = Vec::new();
        for byte in &bytes {
            frames.extend(reassembler.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(payloads(&frames), vec![vec![0x01, 0x02, 0x03, 0x04, 0x05]]);
    }

    #[test]
    fn test_header_split_reports_expected_length() {
        let mut reassembler = FrameReassembler::new();
        let bytes = data_frame(&[0xAB; 10]);
        assert!(reassembler.feed(&bytes[..6]).is_empty());
        assert!(reassembler.is_inside_frame());
        assert_eq!(reassembler.expected_payload_len(), Some(10));
        let frames = reassembler.feed(&bytes[6..]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_multiple_frames_one_read() {
        let mut reassembler = FrameReassembler::new();
        let mut stream = data_frame(&[0x04]);
        stream.extend(data_frame(&[0x05]));
        stream.extend(data_frame(&[0x06]));
        let frames = reassembler.feed(&stream);
        assert_eq!(payloads(&frames), vec![vec![0x04], vec![0x05], vec![0x06]]);
        assert!(frames.iter().all(Frame::is_valid));
    }

    #[test]
    fn test_junk_around_frames() {
        let mut reassembler = FrameReassembler::new();
        let mut stream = b"boot banner v1.0\r\n".to_vec();
        stream.extend(data_frame(&[0x04]));
        stream.extend([0x00, 0x12, 0xAA, 0x13]);
        stream.extend(data_frame(&[0x05]));
        stream.extend([0x99, 0x98]);
        let frames = reassembler.feed(&stream);
        assert_eq!(payloads(&frames), vec![vec![0x04], vec![0x05]]);
        assert_eq!(reassembler.buffered_len(), 0);
    }

    #[test]
    fn test_start_marker_split_across_reads() {
        let mut reassembler = FrameReassembler::new();
        let bytes = data_frame(&[0x05]);
        let mut first = vec![0x10, 0x20];
        first.push(bytes[0]);
        assert!(reassembler.feed(&first).is_empty());
        assert!(reassembler.has_pending_start_byte());
        let frames = reassembler.feed(&bytes[1..]);
        assert_eq!(payloads(&frames), vec![vec![0x05]]);
        assert!(!reassembler.has_pending_start_byte());
    }

    #[test]
    fn test_lone_trailing_start_byte_does_not_stall() {
        let mut reassembler = FrameReassembler::new();
        assert!(reassembler.feed(&[0x01, 0x55]).is_empty());
        assert!(reassembler.has_pending_start_byte());
        let frames = reassembler.feed(&data_frame(&[0x06]));
        assert_eq!(payloads(&frames), vec![vec![0x06]]);
    }

    #[test]
    fn test_trailing_end_marker_is_junk() {
        let mut reassembler = FrameReassembler::new();
        assert!(reassembler.feed(&[0xAA, 0x55]).is_empty());
        assert!(reassembler.feed(&[0x00]).is_empty());
        let frames = reassembler.feed(&data_frame(&[0x04]));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_corrupted_crc_is_surfaced() {
        let mut reassembler = FrameReassembler::new();
        let mut bytes = data_frame(&[0x04, 0x05]);
        bytes[7] ^= 0x01;
        let frames = reassembler.feed(&bytes);
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].is_valid());
    }

    #[test]
    fn test_truncated_frame_resynchronises() {
        let mut reassembler = FrameReassembler::new();
        let full = data_frame(&[0x01, 0x02, 0x03, 0x04]);
        let mut stream = full[..7].to_vec();
        stream.extend(data_frame(&[0x05]));
        stream.extend(data_frame(&[0x06]));
        let frames = reassembler.feed(&stream);
        let valid: Vec<_> = frames.iter().filter(|f| f.is_valid()).collect();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].payload(), &[0x05]);
        assert_eq!(valid[1].payload(), &[0x06]);
        assert!(frames.iter().any(|f| !f.is_valid()));
    }

    #[test]
    fn test_bad_header_is_skipped() {
        let mut reassembler = FrameReassembler::new();
        let mut stream = vec![0x55, 0xAA, 0x7F, 0x00, 0x03];
        stream.extend(data_frame(&[0x04]));
        let frames = reassembler.feed(&stream);
        assert_eq!(payloads(&frames), vec![vec![0x04]]);
    }

    #[test]
    fn test_start_marker_inside_payload() {
        let mut reassembler = FrameReassembler::new();
        let payload = [0x55, 0xAA, 0x02, 0x00, 0x03, 0x55, 0xAA];
        let frames = reassembler.feed(&data_frame(&payload));
        assert_eq!(payloads(&frames), vec![payload.to_vec()]);
        assert!(frames[0].is_valid());
    }

    #[test]
    fn test_partial_frame_kept_until_reset() {
        let mut reassembler = FrameReassembler::new();
        let bytes = data_frame(&[0x04]);
        reassembler.feed(&bytes[..4]);
        assert!(reassembler.is_inside_frame());
        reassembler.reset();
        assert!(!reassembler.is_inside_frame());
        assert_eq!(reassembler.buffered_len(), 0);
        assert!(reassembler.feed(&bytes[4..]).is_empty());
    }
}
