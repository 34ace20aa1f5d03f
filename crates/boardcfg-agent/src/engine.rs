//! Protocol engine.
//!
//! The engine owns the transport, the stream reassembler, the queue of
//! decoded messages and a copy of the last data frame it sent. It opens and
//! closes sessions, answers invalid frames with a NACK and resends its last
//! data frame when the board NACKs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use boardcfg_protocol::{ControlCode, Frame, FrameReassembler, FrameType, Message};
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::error::{EngineError, EngineResult};
use crate::transport::{Transport, TransportKind};

/// Session layer between the state machines and a [`Transport`].
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    reassembler: FrameReassembler,
    queue: VecDeque<Message>,
    /// Only one data frame is ever outstanding; this is it.
    last_data_frame: Option<Vec<u8>>,
}

impl<T: Transport> ProtocolEngine<T> {
    pub fn new(transport: T) -> Self {
        ProtocolEngine {
            transport,
            reassembler: FrameReassembler::new(),
            queue: VecDeque::new(),
            last_data_frame: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Number of decoded messages waiting to be received.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Open the transport and, on serial links, start a session.
    ///
    /// Does nothing if already connected.
    pub fn connect(&mut self) -> EngineResult<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect()?;
        if self.transport.kind() == TransportKind::Serial {
            self.send_control(ControlCode::Init)?;
        }
        debug!("session opened");
        Ok(())
    }

    /// End the session and release the transport.
    ///
    /// The transport is closed even if the end-of-session frame cannot be
    /// written. Queued messages and the retransmit copy are dropped.
    pub fn close(&mut self) -> EngineResult<()> {
        self.queue.clear();
        self.last_data_frame = None;
        self.reassembler.reset();

        if !self.transport.is_connected() {
            return Ok(());
        }
        let ended = if self.transport.kind() == TransportKind::Serial {
            self.send_control(ControlCode::End)
        } else {
            Ok(())
        };
        let closed = self.transport.close();
        debug!("session closed");
        ended?;
        closed?;
        Ok(())
    }

    /// Encode `message`, send it as a data frame and keep a copy for
    /// retransmission.
    pub fn send_data(&mut self, message: &Message) -> EngineResult<()> {
        if !self.transport.is_connected() {
            return Err(EngineError::NotConnected);
        }
        let bytes = Frame::data(&message.encode()?)?.to_bytes();
        debug!("sending {}", message.kind());
        self.transport.send(&bytes)?;
        self.last_data_frame = Some(bytes);
        Ok(())
    }

    /// Ask the board to resend its last data frame.
    pub fn send_nack(&mut self) -> EngineResult<()> {
        self.send_control(ControlCode::Nack)
    }

    /// Next message from the board, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the wait expires or the board ends the
    /// session without sending anything.
    pub fn receive_data(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> EngineResult<Option<Message>> {
        if let Some(message) = self.queue.pop_front() {
            return Ok(Some(message));
        }
        if !self.transport.is_connected() {
            return Err(EngineError::NotConnected);
        }

        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let frames = self.transport.receive(&mut self.reassembler, remaining, cancel)?;
            let mut session_ended = false;
            for frame in frames {
                if !self.dispatch(frame)? {
                    session_ended = true;
                    break;
                }
            }
            if session_ended || !self.queue.is_empty() {
                break;
            }
        }

        Ok(self.queue.pop_front())
    }

    /// Keep servicing the link for `duration` without waiting for any
    /// particular message.
    ///
    /// NACKs arriving in this window resend the data frame that preceded
    /// it; decoded messages stay queued for the next receive.
    pub fn settle(&mut self, duration: Duration, cancel: &CancelToken) -> EngineResult<()> {
        if !self.transport.is_connected() {
            return Err(EngineError::NotConnected);
        }
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            let frames = self.transport.receive(&mut self.reassembler, remaining, cancel)?;
            for frame in frames {
                if !self.dispatch(frame)? {
                    return Ok(());
                }
            }
        }
    }

    /// Handle one inbound frame. Returns `false` once the board has ended
    /// the session.
    fn dispatch(&mut self, frame: Frame) -> EngineResult<bool> {
        if let Err(e) = frame.validate() {
            warn!("{}, sending NACK", e);
            self.send_nack()?;
            return Ok(true);
        }

        match frame.frame_type() {
            Some(FrameType::TransmissionControl) => match frame.control_code() {
                Some(ControlCode::Nack) => self.retransmit()?,
                Some(ControlCode::End) => {
                    debug!("board ended the session");
                    self.transport.close()?;
                    self.reassembler.reset();
                    return Ok(false);
                }
                other => trace!("ignoring control frame {:?}", other),
            },
            Some(FrameType::Data) => match Message::decode(frame.payload()) {
                Ok(message) => {
                    debug!("received {}", message.kind());
                    self.queue.push_back(message);
                }
                Err(e) => debug!("dropping undecodable data frame: {}", e),
            },
            _ => trace!("ignoring frame of type 0x{:02X}", frame.type_code()),
        }
        Ok(true)
    }

    fn retransmit(&mut self) -> EngineResult<()> {
        match &self.last_data_frame {
            Some(bytes) => {
                warn!("board sent NACK, resending last data frame");
                self.transport.send(bytes)?;
            }
            None => warn!("board sent NACK but nothing was sent yet"),
        }
        Ok(())
    }

    fn send_control(&mut self, code: ControlCode) -> EngineResult<()> {
        trace!("sending control {:?}", code);
        self.transport.send(&Frame::control(code).to_bytes())?;
        Ok(())
    }
}

impl<T: Transport> Drop for ProtocolEngine<T> {
    fn drop(&mut self) {
        if self.transport.is_connected() {
            if let Err(e) = self.close() {
                warn!("failed to close session: {}", e);
            }
        }
    }
}
