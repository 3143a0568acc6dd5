//! MJPEG-over-HTTP streaming server
//!
//! A single producer (typically a camera capture callback) submits encoded
//! JPEG frames into a single-slot [`FrameBuffer`]. Each viewer that opens the
//! stream path gets its own [`StreamSession`], which pulls the newest frame on
//! a fixed cadence and writes it as one part of a
//! `multipart/x-mixed-replace` response. Slow viewers skip frames; they never
//! hold up the producer or each other.
//!
//! ```no_run
//! use mjpeg_rs::{Settings, StreamService};
//!
//! # async fn run(jpeg: Vec<u8>) -> mjpeg_rs::Result<()> {
//! let service = StreamService::new(Settings::default());
//! service.start().await?;
//!
//! // From the capture pipeline
//! service.submit_frame(jpeg, 640, 480, 0);
//!
//! // Settings changed
//! service.set_port(8081).await?;
//!
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod error;
pub mod protocol;
pub mod server;
pub mod service;
pub mod session;
pub mod settings;
pub mod stats;

pub use buffer::{Frame, FrameBuffer};
pub use error::{Error, Result};
pub use server::{MjpegServer, Route, RouteTable, ServerConfig, ServerHandle, ServerManager};
pub use service::StreamService;
pub use session::{SessionEnd, SessionPhase, StreamSession};
pub use settings::Settings;
