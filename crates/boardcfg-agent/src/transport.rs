//! Transport abstraction.
//!
//! A transport is a bidirectional byte pipe with an explicit connect/close
//! lifecycle and bounded reads. It never interprets the bytes it carries;
//! framing belongs to the [`FrameReassembler`] that the engine passes in.

use std::time::{Duration, Instant};

use boardcfg_protocol::{Frame, FrameReassembler};
use tracing::trace;

use crate::cancel::CancelToken;
use crate::error::TransportResult;

/// Read buffer size for one poll.
const READ_CHUNK: usize = 256;

/// Physical link kind. Session control frames are only exchanged over
/// serial links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Serial,
    Ble,
}

/// Byte pipe to a board.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    /// Open the link. Connecting an open transport is a no-op.
    fn connect(&mut self) -> TransportResult<()>;

    fn is_connected(&self) -> bool;

    /// Write all of `bytes`.
    fn send(&mut self, bytes: &[u8]) -> TransportResult<()>;

    /// Block for at most the per-read deadline and copy whatever arrived
    /// into `buf`. `Ok(0)` means the deadline passed without data.
    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize>;

    /// Release the link. Closing a closed transport is a no-op.
    fn close(&mut self) -> TransportResult<()>;

    /// Poll until `reassembler` completes at least one frame, `timeout`
    /// elapses or `cancel` is signalled.
    ///
    /// Cancellation is observed between reads; a read in flight always runs
    /// to its deadline. Incomplete frames stay in `reassembler`.
    fn receive(
        &mut self,
        reassembler: &mut FrameReassembler,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> TransportResult<Vec<Frame>> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK];

        while !cancel.is_cancelled() {
            let n = self.read_chunk(&mut buf)?;
            if n > 0 {
                trace!("rx {}", hex::encode(&buf[..n]));
                let frames = reassembler.feed(&buf[..n]);
                if !frames.is_empty() {
                    return Ok(frames);
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok(Vec::new())
    }
}
