//! Session state machine
//!
//! Tracks a streaming session from accept to teardown:
//!
//! ```text
//! Connected ──► Streaming ──► Closed   (server stop, client closed)
//!     │             │
//!     └─────────────┴───────► Failed   (write error, write timeout)
//! ```

use std::io;
use std::time::{Duration, Instant};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request routed to the stream, body not yet polled
    Connected,
    /// Response head sent, producing parts on each cadence tick
    Streaming,
    /// Ended cooperatively
    Closed,
    /// Ended by a failed or stalled write
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Closed | SessionPhase::Failed)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server is stopping
    Shutdown,
    /// The connection went away without a write error being observed
    ClientClosed,
    /// Writing to the client failed
    WriteFailed(io::ErrorKind),
    /// A write did not complete within the write timeout
    WriteTimeout,
}

impl SessionEnd {
    /// Terminal phase for this outcome
    pub fn phase(self) -> SessionPhase {
        match self {
            SessionEnd::Shutdown | SessionEnd::ClientClosed => SessionPhase::Closed,
            SessionEnd::WriteFailed(_) | SessionEnd::WriteTimeout => SessionPhase::Failed,
        }
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub connected_at: Instant,
    /// First recorded outcome; set exactly once
    pub end: Option<SessionEnd>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            end: None,
        }
    }

    /// Response head sent
    pub fn start_streaming(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Move to the terminal phase for `end` and return the outcome that
    /// stands; once terminal, later calls leave the first outcome in place
    pub fn finish(&mut self, end: SessionEnd) -> SessionEnd {
        if !self.phase.is_terminal() {
            self.phase = end.phase();
            self.end = Some(end);
        }
        self.end.unwrap_or(end)
    }

    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
