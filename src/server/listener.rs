//! MJPEG server listener
//!
//! Handles the TCP accept loop and serves each connection with hyper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Request};
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

use super::config::ServerConfig;
use super::handler::{Shared, ViewerInfo};
use super::router;
use super::transport::{LinkStatus, TimedStream};
use crate::buffer::FrameBuffer;
use crate::error::{Error, Result};
use crate::protocol::MultipartEncoder;
use crate::stats::{ServerMetrics, ServerStats};

/// MJPEG HTTP server
///
/// Serves frames from a shared [`FrameBuffer`]. Call [`start`](Self::start)
/// to bind and begin accepting; the returned [`ServerHandle`] stops it.
pub struct MjpegServer {
    config: ServerConfig,
    buffer: Arc<FrameBuffer>,
}

impl MjpegServer {
    /// Create a new server with the given configuration and frame source
    pub fn new(config: ServerConfig, buffer: Arc<FrameBuffer>) -> Self {
        Self { config, buffer }
    }

    /// Bind the listener and spawn the accept loop
    ///
    /// Fails with [`Error::Bind`] if the port is taken or not permitted;
    /// nothing is left running in that case.
    pub async fn start(self) -> Result<ServerHandle> {
        self.config.validate()?;
        let encoder = MultipartEncoder::new(&self.config.boundary)?;
        let stream_content_type = HeaderValue::from_str(&encoder.content_type())
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let bind_addr = self.config.bind_addr;
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let connection_semaphore = if self.config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(self.config.max_connections)))
        } else {
            None
        };

        let shared = Arc::new(Shared {
            config: self.config,
            buffer: self.buffer,
            encoder,
            stream_content_type,
            metrics: Arc::new(ServerMetrics::new()),
            connection_semaphore,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });
        let app = router::build(Arc::clone(&shared))?;

        tracing::info!(addr = %local_addr, boundary = %shared.config.boundary, "MJPEG server listening");

        let accept = tokio::spawn(accept_loop(listener, app, Arc::clone(&shared)));

        Ok(ServerHandle {
            local_addr,
            shared,
            accept: Some(accept),
        })
    }
}

async fn accept_loop(listener: TcpListener, app: Router, shared: Arc<Shared>) {
    let mut next_session_id: u64 = 1;

    loop {
        let accepted = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer_addr)) => {
                let session_id = next_session_id;
                next_session_id += 1;
                handle_connection(socket, peer_addr, session_id, &app, &shared);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
                // Avoid spinning on persistent errors such as EMFILE
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }

    drop(listener);
    tracing::debug!("Accept loop finished, listener closed");
}

fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    session_id: u64,
    app: &Router,
    shared: &Arc<Shared>,
) {
    tracing::debug!(
        session_id = session_id,
        peer = %peer_addr,
        "New connection"
    );

    if shared.config.tcp_nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }
    }

    shared.metrics.connection_accepted();

    let link = Arc::new(LinkStatus::default());
    let viewer = ViewerInfo {
        session_id,
        peer_addr,
        link: Arc::clone(&link),
    };
    let service = app.clone().map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(viewer.clone());
        request
    });
    let service = TowerToHyperService::new(service);
    let io = TokioIo::new(TimedStream::new(socket, shared.config.write_timeout, link));

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(shared.config.request_timeout)
        // A viewer that shuts down its write half still gets the stream
        .half_close(true)
        .keep_alive(false);

    let cancel = shared.cancel.clone();
    shared.tracker.spawn(async move {
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        let mut shutting_down = false;
        let result = loop {
            tokio::select! {
                result = conn.as_mut() => break result,
                _ = cancel.cancelled(), if !shutting_down => {
                    shutting_down = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        };

        if let Err(e) = result {
            tracing::debug!(session_id = session_id, error = %e, "Connection error");
        }
        tracing::debug!(session_id = session_id, "Connection closed");
    });
}

/// A running server instance
///
/// Dropping the handle cancels the server without waiting; call
/// [`stop`](Self::stop) to wait for the listener and every session to finish.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    accept: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Number of streaming sessions currently running
    pub fn active_sessions(&self) -> u64 {
        self.shared.metrics.active_sessions()
    }

    pub fn stats(&self) -> ServerStats {
        self.shared.metrics.snapshot()
    }

    /// Stop accepting, end every session, and wait until all are gone
    ///
    /// When this returns the listening socket has been closed, so the same
    /// port can be bound again.
    pub async fn stop(mut self) {
        tracing::info!(addr = %self.local_addr, active = self.active_sessions(), "Stopping MJPEG server");
        self.shared.cancel.cancel();

        if let Some(accept) = self.accept.take() {
            if let Err(e) = accept.await {
                tracing::error!(error = %e, "Accept loop terminated abnormally");
            }
        }

        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        tracing::info!(addr = %self.local_addr, "MJPEG server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
