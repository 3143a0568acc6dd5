//! Server lifecycle management
//!
//! Owns at most one running [`ServerHandle`]. Start, stop and restart are
//! serialized behind one async mutex, and a restart fully stops the old
//! instance (listener closed, every session finished) before the new one
//! binds. A session from an old instance can therefore never serve a client
//! alongside the new instance.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::config::ServerConfig;
use super::listener::{MjpegServer, ServerHandle};
use crate::buffer::FrameBuffer;
use crate::error::{Error, Result};
use crate::stats::ServerStats;

/// Supervisor for the server bound to a shared frame buffer
pub struct ServerManager {
    buffer: Arc<FrameBuffer>,
    running: Mutex<Option<ServerHandle>>,
}

impl ServerManager {
    pub fn new(buffer: Arc<FrameBuffer>) -> Self {
        Self {
            buffer,
            running: Mutex::new(None),
        }
    }

    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    /// Start a server; fails if one is already running
    pub async fn start(&self, config: ServerConfig) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(handle) = running.as_ref() {
            return Err(Error::AlreadyRunning(handle.local_addr()));
        }

        let handle = MjpegServer::new(config, Arc::clone(&self.buffer)).start().await?;
        let addr = handle.local_addr();
        *running = Some(handle);
        Ok(addr)
    }

    /// Stop the running server, if any, and wait for it to shut down
    ///
    /// Returns whether a server was running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        match running.take() {
            Some(handle) => {
                handle.stop().await;
                true
            }
            None => false,
        }
    }

    /// Stop the current server (if any), then start one with `config`
    ///
    /// If the new server fails to start the manager is left stopped; the old
    /// server is never resurrected.
    pub async fn restart(&self, config: ServerConfig) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;

        if let Some(handle) = running.take() {
            tracing::info!(
                from = %handle.local_addr(),
                to = %config.bind_addr,
                "Restarting MJPEG server"
            );
            handle.stop().await;
        }

        match MjpegServer::new(config, Arc::clone(&self.buffer)).start().await {
            Ok(handle) => {
                let addr = handle.local_addr();
                *running = Some(handle);
                Ok(addr)
            }
            Err(e) => {
                tracing::error!(error = %e, "Restart failed, server stopped");
                Err(e)
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|h| h.local_addr())
    }

    /// Configuration of the running server
    pub async fn config(&self) -> Option<ServerConfig> {
        self.running.lock().await.as_ref().map(|h| h.config().clone())
    }

    pub async fn active_sessions(&self) -> u64 {
        self.running
            .lock()
            .await
            .as_ref()
            .map_or(0, |h| h.active_sessions())
    }

    pub async fn stats(&self) -> Option<ServerStats> {
        self.running.lock().await.as_ref().map(|h| h.stats())
    }
}
