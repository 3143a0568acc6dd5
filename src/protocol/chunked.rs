//! HTTP/1.1 chunked transfer decoding
//!
//! The server side never writes chunk framing itself; hyper frames each body
//! item as one chunk. This decoder is the client half, for consumers reading
//! the raw socket (tests, relays).

use bytes::{Buf, Bytes, BytesMut};

use super::constants::CRLF;
use super::find_subsequence;
use crate::error::DecodeError;

/// A decoded chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Data(Bytes),
    /// The zero-length terminating chunk
    End,
}

/// Incremental parser for a chunked body
#[derive(Debug, Default, Clone)]
pub struct ChunkedDecoder;

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Parse the next chunk from `buf`; `Ok(None)` means more bytes are needed
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Chunk>, DecodeError> {
        let Some(line_end) = find_subsequence(buf, CRLF) else {
            return Ok(None);
        };

        let line = String::from_utf8_lossy(&buf[..line_end]).into_owned();
        // Chunk extensions follow a ';'
        let size_text = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| DecodeError::InvalidChunkSize(line.clone()))?;

        let data_start = line_end + CRLF.len();
        let data_end = data_start
            .checked_add(size)
            .ok_or_else(|| DecodeError::InvalidChunkSize(line.clone()))?;
        let total = data_end
            .checked_add(CRLF.len())
            .ok_or_else(|| DecodeError::InvalidChunkSize(line.clone()))?;

        if buf.len() < total {
            return Ok(None);
        }
        if &buf[data_end..total] != CRLF {
            return Err(DecodeError::MissingTrailer);
        }

        buf.advance(data_start);
        let data = buf.split_to(size).freeze();
        buf.advance(CRLF.len());

        if size == 0 {
            Ok(Some(Chunk::End))
        } else {
            Ok(Some(Chunk::Data(data)))
        }
    }
}
