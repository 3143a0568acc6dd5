//! Statistics for streaming sessions and servers

pub mod metrics;

pub use metrics::{ServerMetrics, ServerStats, SessionStats};
