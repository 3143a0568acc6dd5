//! Statistics and metrics for MJPEG sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-session statistics, owned by the session task
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Parts handed to the connection
    pub frames_sent: u64,
    /// Bytes handed to the connection, including multipart framing
    pub bytes_sent: u64,
    /// Ticks skipped because the frame had already been sent
    pub duplicates_skipped: u64,
    /// Ticks skipped because no frame had been produced yet
    pub empty_ticks: u64,
    /// Ticks skipped because the frame could not be encoded
    pub encode_errors: u64,
    /// Sequence number of the last frame sent
    pub last_sequence: Option<u64>,
    /// Session duration
    pub duration: Duration,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a part written to the client
    pub fn record_sent(&mut self, sequence: u64, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
        self.last_sequence = Some(sequence);
    }

    /// Average send rate in frames per second
    pub fn frame_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

/// Server-wide counters shared by the accept loop and all sessions
#[derive(Debug)]
pub struct ServerMetrics {
    started_at: Instant,
    total_connections: AtomicU64,
    active_sessions: AtomicU64,
    total_sessions: AtomicU64,
    rejected_connections: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            total_sessions: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    pub fn connection_accepted(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_started(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a finished session's totals into the server counters
    pub fn session_finished(&self, stats: &SessionStats) {
        self.frames_sent
            .fetch_add(stats.frames_sent, Ordering::Relaxed);
        self.bytes_sent.fetch_add(stats.bytes_sent, Ordering::Relaxed);
        // Totals land before the session stops counting as active
        self.active_sessions.fetch_sub(1, Ordering::Release);
    }

    /// Number of streaming sessions currently running
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ServerMetrics`]
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Streaming sessions currently running
    pub active_sessions: u64,
    /// Streaming sessions ever started
    pub total_sessions: u64,
    /// Connections turned away by the connection limit
    pub rejected_connections: u64,
    /// Frames sent by finished sessions
    pub frames_sent: u64,
    /// Bytes sent by finished sessions
    pub bytes_sent: u64,
    /// Uptime
    pub uptime: Duration,
}
