//! Session context
//!
//! Identifies a connection in logs and reports.

use std::net::SocketAddr;

/// Read-only information about the connection a session serves
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID within one server instance
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Request path that selected the stream route
    pub path: String,
}

impl SessionContext {
    pub fn new(session_id: u64, peer_addr: SocketAddr, path: impl Into<String>) -> Self {
        Self {
            session_id,
            peer_addr,
            path: path.into(),
        }
    }
}
