//! MJPEG streaming loop
//!
//! A session is the body of one stream response. Each call to
//! [`StreamSession::next_part`] waits for the next cadence tick, reads the
//! latest frame and returns it encoded as one multipart part. The HTTP layer
//! pulls parts only as fast as the client accepts them, so a slow client
//! simply skips frames.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::context::SessionContext;
use super::state::{SessionEnd, SessionPhase, SessionState};
use crate::buffer::FrameBuffer;
use crate::protocol::MultipartEncoder;
use crate::server::config::ServerConfig;
use crate::stats::SessionStats;

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub context: SessionContext,
    pub end: SessionEnd,
    pub phase: SessionPhase,
    pub stats: SessionStats,
}

/// One client's MJPEG stream
pub struct StreamSession {
    context: SessionContext,
    buffer: Arc<FrameBuffer>,
    encoder: MultipartEncoder,
    frame_interval: Duration,
    /// Created on the first poll so construction needs no timer
    ticker: Option<Interval>,
    skip_duplicates: bool,
    cancel: CancellationToken,
    state: SessionState,
    stats: SessionStats,
}

impl StreamSession {
    pub fn new(
        context: SessionContext,
        buffer: Arc<FrameBuffer>,
        encoder: MultipartEncoder,
        config: &ServerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context,
            buffer,
            encoder,
            frame_interval: config.frame_interval,
            ticker: None,
            skip_duplicates: config.skip_duplicate_frames,
            cancel,
            state: SessionState::new(),
            stats: SessionStats::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Wait for the next frame worth sending and encode it
    ///
    /// Returns `None` once the session has been cancelled or finished; the
    /// stream response then ends cleanly.
    pub async fn next_part(&mut self) -> Option<Bytes> {
        if self.state.phase.is_terminal() {
            return None;
        }
        if self.state.phase == SessionPhase::Connected {
            self.state.start_streaming();
            tracing::debug!(
                session_id = self.context.session_id,
                peer = %self.context.peer_addr,
                "Streaming started"
            );
        }

        let frame_interval = self.frame_interval;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state.finish(SessionEnd::Shutdown);
                    return None;
                }
                _ = ticker.tick() => {}
            }

            let Some(frame) = self.buffer.latest() else {
                self.stats.empty_ticks += 1;
                continue;
            };

            let sequence = frame.sequence();
            if self.skip_duplicates && self.stats.last_sequence == Some(sequence) {
                self.stats.duplicates_skipped += 1;
                continue;
            }

            let part = match self.encoder.encode(&frame) {
                Ok(part) => part,
                Err(e) => {
                    self.stats.encode_errors += 1;
                    tracing::trace!(
                        session_id = self.context.session_id,
                        error = %e,
                        "Skipping frame"
                    );
                    continue;
                }
            };
            drop(frame);

            // One contiguous item so the part travels as a single chunk
            let part = part.to_bytes();
            self.stats.record_sent(sequence, part.len());
            tracing::trace!(
                session_id = self.context.session_id,
                sequence = sequence,
                bytes = part.len(),
                "Frame sent"
            );
            return Some(part);
        }
    }

    /// Record how the session ended and produce its report
    ///
    /// The first recorded outcome wins: a session that already stopped for
    /// shutdown keeps that outcome even if the transport fails afterwards.
    pub fn finish(&mut self, end: SessionEnd) -> SessionReport {
        let end = self.state.finish(end);
        self.stats.duration = self.state.duration();

        SessionReport {
            context: self.context.clone(),
            end,
            phase: self.state.phase,
            stats: self.stats.clone(),
        }
    }
}
