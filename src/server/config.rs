//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::router::RouteTable;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::multipart::validate_boundary;

/// Server configuration options
///
/// Immutable for the lifetime of a server instance. Changing any field
/// means stopping the server and starting a new one.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (port 0 picks an ephemeral port)
    pub bind_addr: SocketAddr,

    /// Multipart boundary token
    pub boundary: String,

    /// Minimum time between sends to one client
    pub frame_interval: Duration,

    /// Path to route mapping
    pub routes: RouteTable,

    /// Maximum concurrent streaming sessions (0 = unlimited)
    pub max_connections: usize,

    /// Request head must arrive within this time
    pub request_timeout: Duration,

    /// A stalled write to the client fails after this long
    pub write_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Do not re-send a frame a client has already received
    pub skip_duplicate_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            boundary: DEFAULT_BOUNDARY.to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            routes: RouteTable::default(),
            max_connections: 0, // Unlimited
            request_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            tcp_nodelay: true, // Important for low latency
            skip_duplicate_frames: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Create a new config listening on all interfaces at `port`
    pub fn with_port(port: u16) -> Self {
        Self::default().port(port)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Keep the bind IP, change the port
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Set maximum concurrent streaming sessions
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Send every tick even when the frame has not changed
    pub fn resend_duplicate_frames(mut self) -> Self {
        self.skip_duplicate_frames = false;
        self
    }

    /// Check the configuration before binding
    pub fn validate(&self) -> Result<()> {
        validate_boundary(&self.boundary)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        if self.frame_interval.is_zero() {
            return Err(Error::InvalidConfig("frame interval must be non-zero".into()));
        }
        if self.request_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        self.routes.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router::Route;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.boundary, "myboundary");
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert!(config.skip_duplicate_frames);
        assert_eq!(config.routes.stream_path(), Some("/video"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_port_keeps_ip() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::with_addr(addr).port(9090);

        assert_eq!(config.bind_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(ServerConfig::with_port(1234).bind_addr.port(), 1234);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .boundary("frame")
            .frame_interval(Duration::from_millis(33))
            .max_connections(4)
            .request_timeout(Duration::from_secs(2))
            .write_timeout(Duration::from_secs(1))
            .resend_duplicate_frames();

        assert_eq!(config.boundary, "frame");
        assert_eq!(config.frame_interval, Duration::from_millis(33));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_secs(1));
        assert!(!config.skip_duplicate_frames);
    }

    #[test]
    fn test_validate_rejects_bad_boundary() {
        let config = ServerConfig::default().boundary("bad boundary");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ServerConfig::default().frame_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_route() {
        let config = ServerConfig::default().routes(RouteTable::default().route("video", Route::Stream));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
