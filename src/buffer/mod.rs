//! Latest-frame handoff between the producer and streaming sessions
//!
//! The buffer holds at most one frame. Submitting a frame swaps an
//! `Arc<Frame>` into the slot; sessions read by cloning the `Arc`.
//!
//! ```text
//!   [Producer]                 Arc<FrameBuffer>              [Sessions]
//!   submit(frame) ──swap──►  slot: Option<Arc<Frame>>  ◄── latest()  (session 1)
//!                                                      ◄── latest()  (session 2)
//! ```
//!
//! There is no queue. A slow session simply observes fewer frames; the
//! producer never waits on a reader.
//!
//! # Zero-Copy Design
//!
//! Frame payloads are `bytes::Bytes`, so every session writes from the
//! producer's allocation. A stale frame is freed as soon as the last session
//! holding it finishes its current write.

pub mod frame;
pub mod slot;

pub use frame::Frame;
pub use slot::FrameBuffer;
