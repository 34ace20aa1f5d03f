//! Property tests for the frame codec and the stream reassembler.

use boardcfg_protocol::{encode_frame, Frame, FrameReassembler, FrameType, MAX_PAYLOAD_LEN};
use proptest::prelude::*;

fn arb_frame_type() -> impl Strategy<Value = FrameType> {
    prop_oneof![Just(FrameType::Data), Just(FrameType::TransmissionControl)]
}

fn arb_frame() -> impl Strategy<Value = (FrameType, Vec<u8>)> {
    (arb_frame_type(), proptest::collection::vec(any::<u8>(), 1..=96))
}

/// Junk that may hold lone `0x55` and `0xAA` bytes but never a `55 AA`
/// start marker of its own.
fn arb_junk() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![Just(0x55u8), Just(0xAAu8), any::<u8>()],
        0..=12,
    )
    .prop_map(|mut junk| {
        for i in 1..junk.len() {
            if junk[i - 1] == 0x55 && junk[i] == 0xAA {
                junk[i] = 0x00;
            }
        }
        junk
    })
}

/// Feed `stream` in chunks whose sizes cycle through `cuts`.
///
/// At most a trailing `0x55` may stay buffered: it could still be the start
/// of a marker.
fn feed_in_chunks(stream: &[u8], cuts: &[usize]) -> Vec<Frame> {
    let mut reassembler = FrameReassembler::new();
    let mut frames = Vec::new();
    let mut offset = 0;
    let mut i = 0;
    while offset < stream.len() {
        let size = cuts[i % cuts.len()].min(stream.len() - offset);
        frames.extend(reassembler.feed(&stream[offset..offset + size]));
        offset += size;
        i += 1;
    }
    let held = reassembler.buffered_len();
    assert!(
        held == 0 || (held == 1 && stream.last() == Some(&0x55)),
        "stream fully consumed, {} bytes left",
        held
    );
    frames
}

fn summary(frames: &[Frame]) -> Vec<(Option<FrameType>, Vec<u8>)> {
    frames
        .iter()
        .map(|f| {
            assert!(f.is_valid(), "unexpected invalid frame {:?}", f);
            (f.frame_type(), f.payload().to_vec())
        })
        .collect()
}

// ============================================================================
// Round trip
// ============================================================================

proptest! {
    #[test]
    fn encode_then_decode_preserves_payload_and_type((frame_type, payload) in arb_frame()) {
        let bytes = encode_frame(frame_type, &payload).unwrap();
        prop_assert_eq!(bytes.len(), payload.len() + 9);
        let frame = Frame::decode(&bytes).unwrap();
        prop_assert_eq!(frame.frame_type(), Some(frame_type));
        prop_assert_eq!(frame.payload(), payload.as_slice());
    }
}

#[test]
fn test_largest_payload_round_trips() {
    let payload = vec![0x5Au8; MAX_PAYLOAD_LEN];
    let bytes = encode_frame(FrameType::Data, &payload).unwrap();
    assert_eq!(&bytes[3..5], &[0xFF, 0xFF]);
    let frame = Frame::decode(&bytes).unwrap();
    assert_eq!(frame.payload().len(), MAX_PAYLOAD_LEN);
}

// ============================================================================
// Reassembly
// ============================================================================

proptest! {
    #[test]
    fn any_chunking_yields_the_same_frames(
        frames in proptest::collection::vec(arb_frame(), 1..=6),
        cuts in proptest::collection::vec(1usize..=24, 1..=8),
    ) {
        let mut stream = Vec::new();
        for (frame_type, payload) in &frames {
            stream.extend(encode_frame(*frame_type, payload).unwrap());
        }
        let decoded = feed_in_chunks(&stream, &cuts);
        let expected: Vec<_> = frames.iter().map(|(t, p)| (Some(*t), p.clone())).collect();
        prop_assert_eq!(summary(&decoded), expected);
    }

    #[test]
    fn junk_between_frames_is_ignored(
        frames in proptest::collection::vec((arb_frame(), arb_junk()), 1..=6),
        leading in arb_junk(),
        cuts in proptest::collection::vec(1usize..=24, 1..=8),
    ) {
        let mut stream = leading;
        for ((frame_type, payload), junk) in &frames {
            stream.extend(encode_frame(*frame_type, payload).unwrap());
            stream.extend(junk);
        }
        let decoded = feed_in_chunks(&stream, &cuts);
        let expected: Vec<_> = frames.iter().map(|((t, p), _)| (Some(*t), p.clone())).collect();
        prop_assert_eq!(summary(&decoded), expected);
    }
}

#[test]
fn test_lone_marker_bytes_in_junk() {
    let mut stream = vec![0xAA, 0x55, 0x01, 0x55];
    stream.extend(encode_frame(FrameType::Data, &[0x11]).unwrap());
    stream.extend([0x55, 0x55, 0x01, 0xAA, 0xAA, 0x55]);
    stream.extend(encode_frame(FrameType::Data, &[0x22]).unwrap());

    for size in [1, 2, 3, stream.len()] {
        let decoded = feed_in_chunks(&stream, &[size]);
        let payloads: Vec<_> = decoded.iter().map(|f| f.payload().to_vec()).collect();
        assert_eq!(payloads, vec![vec![0x11], vec![0x22]], "chunk size {}", size);
    }
}

// ============================================================================
// CRC
// ============================================================================

proptest! {
    #[test]
    fn single_bit_flip_is_rejected(
        payload in proptest::collection::vec(any::<u8>(), 1..=64),
        bit in any::<prop::sample::Index>(),
    ) {
        let mut bytes = encode_frame(FrameType::Data, &payload).unwrap();
        // Payload and CRC occupy bytes 5 .. len - 2.
        let protected_bits = (payload.len() + 2) * 8;
        let target = bit.index(protected_bits);
        bytes[5 + target / 8] ^= 1 << (target % 8);

        prop_assert!(Frame::decode(&bytes).is_err());

        let mut reassembler = FrameReassembler::new();
        let frames = reassembler.feed(&bytes);
        prop_assert!(frames.iter().all(|f| !f.is_valid()));
    }
}
