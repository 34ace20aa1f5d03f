//! In-memory transport for tests and dry runs.
//!
//! [`MockTransport`] is handed to the engine while the paired [`MockBoard`]
//! handle plays the board: it queues inbound bytes, records every write and
//! can answer writes through a responder closure.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boardcfg_protocol::{Frame, FrameType, Message};
use parking_lot::Mutex;

use crate::error::{TransportError, TransportResult};
use crate::transport::{Transport, TransportKind};

/// How long an empty read blocks, standing in for the per-read deadline.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Called with every write; returns chunks to queue for reading.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct BoardState {
    connected: bool,
    refuse_connect: bool,
    inbound: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    responder: Option<Responder>,
    connects: usize,
    closes: usize,
}

/// Engine side of the in-memory link.
pub struct MockTransport {
    state: Arc<Mutex<BoardState>>,
    kind: TransportKind,
    poll_interval: Duration,
}

/// Board side of the in-memory link.
#[derive(Clone)]
pub struct MockBoard {
    state: Arc<Mutex<BoardState>>,
}

impl MockTransport {
    /// Serial-kind transport and its board handle.
    pub fn new() -> (MockTransport, MockBoard) {
        Self::with_kind(TransportKind::Serial)
    }

    pub fn with_kind(kind: TransportKind) -> (MockTransport, MockBoard) {
        let state = Arc::new(Mutex::new(BoardState::default()));
        let transport = MockTransport {
            state: Arc::clone(&state),
            kind,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        (transport, MockBoard { state })
    }
}

impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn connect(&mut self) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.refuse_connect {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "port busy",
            )));
        }
        if !state.connected {
            state.connected = true;
            state.connects += 1;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn send(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.writes.push(bytes.to_vec());
        if let Some(responder) = state.responder.as_mut() {
            state.inbound.extend(responder(bytes));
        }
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            if let Some(mut chunk) = state.inbound.pop_front() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    state.inbound.push_front(chunk.split_off(n));
                }
                return Ok(n);
            }
        }
        thread::sleep(self.poll_interval);
        Ok(0)
    }

    fn close(&mut self) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.connected {
            state.connected = false;
            state.closes += 1;
        }
        Ok(())
    }
}

impl MockBoard {
    /// Queue raw bytes for the engine to read.
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.state.lock().inbound.push_back(bytes.into());
    }

    /// Queue a frame.
    pub fn push_frame(&self, frame: &Frame) {
        self.push_bytes(frame.to_bytes());
    }

    /// Queue a message in a data frame.
    pub fn push_message(&self, message: &Message) {
        self.push_bytes(frame_message(message));
    }

    /// Answer every write through `responder`.
    pub fn on_write(&self, responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) {
        self.state.lock().responder = Some(Box::new(responder));
    }

    /// Answer every data message the engine sends with zero or more
    /// messages. Control frames are not passed to `responder`.
    pub fn on_message(&self, mut responder: impl FnMut(&Message) -> Vec<Message> + Send + 'static) {
        self.on_write(move |bytes| match decode_data(bytes) {
            Some(message) => responder(&message).iter().map(frame_message).collect(),
            None => Vec::new(),
        });
    }

    /// Make the next connect attempts fail.
    pub fn refuse_connect(&self, refuse: bool) {
        self.state.lock().refuse_connect = refuse;
    }

    /// Every write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.state.lock().writes.last().cloned()
    }

    /// Writes that parse as valid frames.
    pub fn written_frames(&self) -> Vec<Frame> {
        self.writes()
            .iter()
            .filter_map(|bytes| Frame::decode(bytes).ok())
            .collect()
    }

    /// Messages carried by data frames the engine wrote.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.writes().iter().filter_map(|bytes| decode_data(bytes)).collect()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Bytes queued but not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.state.lock().inbound.iter().map(Vec::len).sum()
    }
}

/// Wire bytes of `message` in a data frame.
pub fn frame_message(message: &Message) -> Vec<u8> {
    message
        .encode()
        .and_then(|payload| Frame::data(&payload))
        .map(|frame| frame.to_bytes())
        .unwrap_or_default()
}

fn decode_data(bytes: &[u8]) -> Option<Message> {
    let frame = Frame::decode(bytes).ok()?;
    if frame.frame_type() != Some(FrameType::Data) {
        return None;
    }
    Message::decode(frame.payload()).ok()
}
