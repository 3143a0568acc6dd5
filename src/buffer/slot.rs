//! Single-slot frame buffer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::frame::Frame;

/// Thread-safe holder for the most recent frame
///
/// Backed by a `tokio::sync::watch` channel holding `Option<Arc<Frame>>`.
/// `None` means no frame has been produced yet, which is distinct from a
/// frame with an empty payload.
#[derive(Debug)]
pub struct FrameBuffer {
    tx: watch::Sender<Option<Arc<Frame>>>,
    /// Last assigned sequence number; only advanced under the slot lock
    last_sequence: AtomicU64,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            last_sequence: AtomicU64::new(0),
        }
    }

    /// Replace the current frame
    ///
    /// Never blocks beyond the slot swap and never fails. Returns the
    /// sequence number assigned to the frame. Sequence numbers keep
    /// increasing across [`clear`](Self::clear).
    pub fn submit(&self, frame: Frame) -> u64 {
        let mut assigned = 0;
        self.tx.send_modify(|slot| {
            assigned = self.last_sequence.fetch_add(1, Ordering::Relaxed) + 1;
            *slot = Some(Arc::new(frame.with_sequence(assigned)));
        });

        tracing::trace!(sequence = assigned, "Frame submitted");
        assigned
    }

    /// The current frame, or `None` if nothing has been submitted yet
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.tx.borrow().clone()
    }

    /// Sequence number of the current frame (0 when empty)
    pub fn sequence(&self) -> u64 {
        self.tx.borrow().as_ref().map_or(0, |f| f.sequence())
    }

    /// Drop the current frame so its memory can be released
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
