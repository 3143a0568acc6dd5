//! Error types
//!
//! Only bind failures and configuration problems escape to the caller.
//! Per-connection failures (malformed requests, write errors) are contained
//! by the connection task, and `EncodeError` is contained by a single
//! cadence tick.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The listener could not be bound (port in use, permission denied)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// A server is already listening
    #[error("server already running on {0}")]
    AlreadyRunning(SocketAddr),

    /// Server configuration rejected by `ServerConfig::validate`
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Port text that is not an integer in 1..=65535
    #[error("Invalid port number: {0:?}")]
    InvalidPort(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("settings error: {0}")]
    Settings(#[from] serde_yaml_ng::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this is a bind failure
    pub fn is_bind(&self) -> bool {
        matches!(self, Error::Bind { .. })
    }
}

/// Failure to encode a frame into a multipart part
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Frame has no payload bytes
    #[error("frame {sequence} has an empty payload")]
    EmptyFrame { sequence: u64 },

    /// Boundary token violates RFC 2046
    #[error("invalid multipart boundary: {0:?}")]
    InvalidBoundary(String),
}

/// Failure to parse a multipart or chunked stream back into parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected boundary delimiter, found {0:?}")]
    MissingBoundary(String),

    #[error("part is missing a Content-Length header")]
    MissingContentLength,

    #[error("invalid header line: {0:?}")]
    InvalidHeader(String),

    #[error("part payload is not followed by CRLF")]
    MissingTrailer,

    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),
}
