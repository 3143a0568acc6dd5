//! Per-client streaming sessions
//!
//! A session owns one client connection and pulls from the shared
//! [`FrameBuffer`](crate::buffer::FrameBuffer) on a fixed cadence.

pub mod context;
pub mod state;
pub mod stream;

pub use context::SessionContext;
pub use state::{SessionEnd, SessionPhase, SessionState};
pub use stream::{SessionReport, StreamSession};
