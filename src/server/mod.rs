//! MJPEG HTTP server
//!
//! ```text
//!   ServerManager ── owns ──► ServerHandle ── cancels ──► accept loop
//!                                   │                         │ spawns
//!                                   │ tracks                  ▼
//!                                   └────────────── hyper connection ──► axum Router
//!                                                                          │ stream route
//!                                                                          ▼
//!                              Arc<FrameBuffer> ◄── latest() ── StreamSession (response body)
//! ```
//!
//! Every server instance has one root `CancellationToken`; each session
//! runs on a child token. Stopping cancels the root, asks every hyper
//! connection to shut down gracefully and waits on the `TaskTracker`
//! holding every connection task and session body.

pub mod config;
pub(crate) mod handler;
pub mod lifecycle;
pub mod listener;
pub mod router;
pub(crate) mod transport;

pub use config::ServerConfig;
pub use lifecycle::ServerManager;
pub use listener::{MjpegServer, ServerHandle};
pub use router::{Route, RouteTable};
