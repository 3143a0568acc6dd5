//! Protocol constants

use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Default multipart boundary token
pub const DEFAULT_BOUNDARY: &str = "myboundary";

/// Default path serving the MJPEG stream
pub const DEFAULT_VIDEO_PATH: &str = "/video";

/// Body returned by the status route
pub const DEFAULT_STATUS_BODY: &str = "IP Webcam Running!";

/// Target minimum time between sends to one client (~60 Hz)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Content type of each multipart part
pub const PART_CONTENT_TYPE: &str = "image/jpeg";

/// Content type prefix of the stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace";

/// Maximum boundary length allowed by RFC 2046
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Most request body bytes read and discarded before a 405 response
pub const MAX_DISCARDED_BODY: usize = 64 * 1024;

/// Longest wait for a rejected request's body before answering anyway
pub const DISCARD_BODY_TIMEOUT: Duration = Duration::from_secs(1);

pub const CRLF: &[u8] = b"\r\n";
