//! Streaming service
//!
//! The composition root a front end talks to. It owns the frame buffer and
//! the server manager, accepts frames from the capture pipeline, and starts,
//! restarts or stops the server when the configured port changes.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::buffer::{Frame, FrameBuffer};
use crate::error::Result;
use crate::protocol::constants::DEFAULT_VIDEO_PATH;
use crate::server::{ServerConfig, ServerManager};
use crate::settings::Settings;

/// Front-end facing API of the webcam server
pub struct StreamService {
    buffer: Arc<FrameBuffer>,
    manager: ServerManager,
    /// Every restart uses this config with the current port
    template: ServerConfig,
    port: AtomicU16,
}

impl StreamService {
    /// Service using default server options and the persisted port
    pub fn new(settings: Settings) -> Self {
        Self::with_config(ServerConfig::with_port(settings.port))
    }

    /// Service using `config` for every server it starts
    pub fn with_config(config: ServerConfig) -> Self {
        let buffer = Arc::new(FrameBuffer::new());
        Self {
            manager: ServerManager::new(Arc::clone(&buffer)),
            buffer,
            port: AtomicU16::new(config.bind_addr.port()),
            template: config,
        }
    }

    /// Hand a newly encoded frame to all viewers; returns its sequence number
    ///
    /// Only swaps the buffer slot, so it is safe to call from the capture
    /// callback thread.
    pub fn submit_frame(&self, data: impl Into<Bytes>, width: u32, height: u32, timestamp: u64) -> u64 {
        self.buffer.submit(Frame::new(data, width, height, timestamp))
    }

    /// (Re)start the server on `port`
    ///
    /// Port 0 is rejected with [`Error::InvalidPort`](crate::Error::InvalidPort)
    /// since the connection URL is built from the configured port.
    pub async fn start_server(&self, port: u16) -> Result<SocketAddr> {
        Settings::check_port(port)?;
        self.port.store(port, Ordering::Relaxed);
        self.manager.restart(self.template.clone().port(port)).await
    }

    /// Start on the configured port
    pub async fn start(&self) -> Result<SocketAddr> {
        self.start_server(self.port()).await
    }

    /// Stop the server; returns whether one was running
    pub async fn stop_server(&self) -> bool {
        self.manager.stop().await
    }

    /// Apply a port change from settings
    ///
    /// Restarts the server only when the port actually changes and a server
    /// is running. Returns the new bound address when a restart happened.
    pub async fn set_port(&self, port: u16) -> Result<Option<SocketAddr>> {
        Settings::check_port(port)?;
        let previous = self.port.swap(port, Ordering::Relaxed);
        if previous == port {
            return Ok(None);
        }

        tracing::info!(from = previous, to = port, "Port changed");
        if self.manager.is_running().await {
            self.start_server(port).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Relaxed)
    }

    /// URL viewers should open, e.g. `http://192.168.1.20:8080/video`
    pub fn connection_url(&self, host: Option<IpAddr>) -> String {
        let host = host.map_or_else(|| "Unknown IP".to_string(), |ip| match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{}]", v6),
        });
        let path = self
            .template
            .routes
            .stream_path()
            .unwrap_or(DEFAULT_VIDEO_PATH);

        format!("http://{}:{}{}", host, self.port(), path)
    }

    /// Human-readable line for the front end
    pub fn status_text(&self, host: Option<IpAddr>) -> String {
        format!("Connect to: {}", self.connection_url(host))
    }

    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    pub fn manager(&self) -> &ServerManager {
        &self.manager
    }

    /// Stop serving and release the last frame
    pub async fn shutdown(&self) {
        self.manager.stop().await;
        self.buffer.clear();
        tracing::info!("Stream service shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::error::Error;

    /// A port nothing is listening on right now
    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn local_service() -> StreamService {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, free_port()));
        StreamService::with_config(ServerConfig::with_addr(addr))
    }

    #[test]
    fn test_connection_url() {
        let service = StreamService::new(Settings::default());

        assert_eq!(
            service.connection_url(Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))),
            "http://192.168.1.20:8080/video"
        );
        assert_eq!(service.connection_url(None), "http://Unknown IP:8080/video");
        assert_eq!(
            service.connection_url(Some(IpAddr::V6(Ipv6Addr::LOCALHOST))),
            "http://[::1]:8080/video"
        );
        assert_eq!(
            service.status_text(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))),
            "Connect to: http://10.0.0.2:8080/video"
        );
    }

    #[test]
    fn test_submit_frame() {
        let service = StreamService::new(Settings::default());

        assert_eq!(service.submit_frame(vec![1u8; 10], 640, 480, 100), 1);
        assert_eq!(service.submit_frame(vec![2u8; 20], 640, 480, 133), 2);

        let latest = service.buffer().latest().unwrap();
        assert_eq!(latest.len(), 20);
        assert_eq!(latest.timestamp(), 133);
    }

    #[tokio::test]
    async fn test_set_port_without_server() {
        let service = local_service();
        let port = service.port();

        assert_eq!(service.set_port(port).await.unwrap(), None);
        assert_eq!(service.set_port(9999).await.unwrap(), None);
        assert_eq!(service.port(), 9999);
        assert!(!service.manager().is_running().await);
    }

    #[tokio::test]
    async fn test_set_port_restarts_running_server() {
        let service = local_service();
        let first = service.start().await.unwrap();
        assert_eq!(first.port(), service.port());

        let target = free_port();

        let moved = service.set_port(target).await.unwrap().unwrap();
        assert_eq!(moved.port(), target);
        assert_ne!(moved, first);
        assert_eq!(service.manager().local_addr().await, Some(moved));

        // Same port again is a no-op
        assert_eq!(service.set_port(target).await.unwrap(), None);

        service.shutdown().await;
        assert!(!service.manager().is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_clears_frame() {
        let service = local_service();
        service.start().await.unwrap();
        service.submit_frame(vec![9u8; 4], 2, 2, 0);

        service.shutdown().await;
        assert!(service.buffer().latest().is_none());
    }

    #[tokio::test]
    async fn test_port_zero_rejected() {
        let service = local_service();
        let port = service.port();

        assert!(matches!(service.start_server(0).await, Err(Error::InvalidPort(_))));
        assert!(!service.manager().is_running().await);

        let addr = service.start().await.unwrap();
        assert!(matches!(service.set_port(0).await, Err(Error::InvalidPort(_))));

        // The running server and the advertised port are untouched
        assert_eq!(service.port(), port);
        assert_eq!(service.manager().local_addr().await, Some(addr));
        assert!(service.connection_url(None).ends_with(&format!(":{}/video", port)));

        service.shutdown().await;
    }
}
