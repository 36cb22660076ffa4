//! Lifecycle of the single persistent connection to the backend.
//!
//! The session never touches a socket. The transport reports what happened
//! (opened, message, closed) tagged with the generation it was started for,
//! and drains [`ConnectionSession::take_outbound`] to learn what to write.
//! Events from a superseded generation are dropped, which is what keeps a
//! replaced connection from rendering or keeping itself alive.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use runtime::Heartbeat;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{HEARTBEAT_FRAME, ProtocolError, RequestPayload, ResponseFrame};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Closed,
    Opening,
    Open,
}

/// Identifies one `start` call; transports echo it back with every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub generation: u64,
    pub session_id: String,
}

#[derive(Debug)]
pub struct ConnectionSession {
    phase: SessionPhase,
    generation: u64,
    session_id: Option<String>,
    query: String,
    heartbeat: Heartbeat,
    outbound: VecDeque<String>,
    frames_received: u64,
}

impl ConnectionSession {
    pub fn new(keep_alive: Duration) -> Self {
        Self {
            phase: SessionPhase::Closed,
            generation: 0,
            session_id: None,
            query: String::new(),
            heartbeat: Heartbeat::new(keep_alive),
            outbound: VecDeque::new(),
            frames_received: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.phase != SessionPhase::Closed && generation == self.generation
    }

    /// Replaces whatever session existed with a new one in `Opening`.
    pub fn start(&mut self, query: impl Into<String>) -> SessionTicket {
        if self.phase != SessionPhase::Closed {
            info!(
                session = self.session_id.as_deref().unwrap_or("-"),
                "superseding session"
            );
        }
        self.generation = self.generation.wrapping_add(1);
        let session_id = Uuid::new_v4().to_string();
        self.session_id = Some(session_id.clone());
        self.query = query.into();
        self.phase = SessionPhase::Opening;
        self.heartbeat.cancel();
        self.outbound.clear();
        self.frames_received = 0;
        info!(session = %session_id, query = %self.query, "opening session");
        SessionTicket {
            generation: self.generation,
            session_id,
        }
    }

    /// Moves to `Open` and arms the keep-alive. Returns false for a stale
    /// generation; the caller then sends nothing.
    pub fn on_opened(&mut self, generation: u64, now: Instant) -> bool {
        if !self.is_current(generation) || self.phase != SessionPhase::Opening {
            debug!(generation, "ignoring open for stale session");
            return false;
        }
        self.phase = SessionPhase::Open;
        self.heartbeat.arm(now);
        info!(session = self.session_id.as_deref().unwrap_or("-"), "session open");
        true
    }

    /// Queues a request. Outside `Open` this is a silent no-op.
    pub fn send(&mut self, payload: &RequestPayload) -> bool {
        if !self.is_open() {
            debug!(phase = ?self.phase, "dropping request, connection not open");
            return false;
        }
        match payload.encode() {
            Ok(text) => {
                debug!(zoom = payload.zoom, new_query = payload.new_query, "queue request");
                self.outbound.push_back(text);
                true
            }
            Err(err) => {
                warn!("{err}");
                false
            }
        }
    }

    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        self.heartbeat.deadline()
    }

    /// Fires the keep-alive if due. The schedule advances whether or not the
    /// frame could be queued.
    pub fn on_heartbeat(&mut self, now: Instant) -> bool {
        if !self.heartbeat.poll(now) {
            return false;
        }
        if !self.is_open() {
            return false;
        }
        debug!(beat = self.heartbeat.fired(), "queue heartbeat");
        self.outbound.push_back(HEARTBEAT_FRAME.to_string());
        true
    }

    /// Decodes an inbound frame. `None` means it belonged to a replaced
    /// session and must be ignored.
    pub fn on_message(
        &mut self,
        generation: u64,
        text: &str,
    ) -> Option<Result<ResponseFrame, ProtocolError>> {
        if !self.is_current(generation) {
            debug!(generation, "dropping frame from stale session");
            return None;
        }
        self.frames_received += 1;
        Some(ResponseFrame::decode(text))
    }

    /// Transport reported the connection gone. Returns false when that
    /// connection had already been superseded.
    pub fn on_closed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        warn!(
            session = self.session_id.as_deref().unwrap_or("-"),
            "connection closed; issue a new draw to reconnect"
        );
        self.close();
        true
    }

    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
        self.heartbeat.cancel();
        self.outbound.clear();
    }

    /// Frames to write, oldest first.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.outbound.drain(..).collect()
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new(runtime::DEFAULT_KEEP_ALIVE)
    }
}
