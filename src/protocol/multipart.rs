//! Multipart MJPEG part encoding and decoding
//!
//! Each frame becomes exactly one part:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <N>\r\n
//! \r\n
//! <N bytes of JPEG data>\r\n
//! ```
//!
//! `MultipartEncoder` is the only place the boundary token and header order
//! are written. The declared length is taken from the same `Bytes` that is
//! written as the payload, so the two cannot disagree.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::{CRLF, MAX_BOUNDARY_LEN, PART_CONTENT_TYPE, STREAM_CONTENT_TYPE};
use super::find_subsequence;
use crate::buffer::Frame;
use crate::error::{DecodeError, EncodeError};

/// Check a boundary token against RFC 2046 `bchars`
///
/// Spaces are rejected as well so the token never needs quoting in the
/// `Content-Type` header.
pub fn validate_boundary(boundary: &str) -> Result<(), EncodeError> {
    let valid_len = !boundary.is_empty() && boundary.len() <= MAX_BOUNDARY_LEN;
    let valid_chars = boundary
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b"'()+_,-./:=?".contains(&b));

    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(EncodeError::InvalidBoundary(boundary.to_string()))
    }
}

/// Encoder bound to one boundary token
#[derive(Debug, Clone)]
pub struct MultipartEncoder {
    boundary: Arc<str>,
    /// `--<boundary>\r\nContent-Type: image/jpeg\r\n`, built once
    delimiter: Bytes,
}

impl MultipartEncoder {
    /// Create an encoder, rejecting boundaries that violate RFC 2046
    pub fn new(boundary: &str) -> Result<Self, EncodeError> {
        validate_boundary(boundary)?;

        let mut delimiter = BytesMut::with_capacity(boundary.len() + 32);
        delimiter.put_slice(b"--");
        delimiter.put_slice(boundary.as_bytes());
        delimiter.put_slice(CRLF);
        delimiter.put_slice(b"Content-Type: ");
        delimiter.put_slice(PART_CONTENT_TYPE.as_bytes());
        delimiter.put_slice(CRLF);

        Ok(Self {
            boundary: Arc::from(boundary),
            delimiter: delimiter.freeze(),
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the stream response's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", STREAM_CONTENT_TYPE, self.boundary)
    }

    /// Encode one frame as a complete part
    ///
    /// Empty frames are rejected; the caller skips that tick.
    pub fn encode(&self, frame: &Frame) -> Result<EncodedPart, EncodeError> {
        if frame.is_empty() {
            return Err(EncodeError::EmptyFrame {
                sequence: frame.sequence(),
            });
        }

        let payload = frame.data().clone();
        let length = payload.len().to_string();

        let mut head = BytesMut::with_capacity(self.delimiter.len() + length.len() + 24);
        head.put_slice(&self.delimiter);
        head.put_slice(b"Content-Length: ");
        head.put_slice(length.as_bytes());
        head.put_slice(CRLF);
        head.put_slice(CRLF);

        Ok(EncodedPart {
            head: head.freeze(),
            payload,
        })
    }
}

/// One encoded part, kept in pieces so the payload is never copied
#[derive(Debug, Clone)]
pub struct EncodedPart {
    head: Bytes,
    payload: Bytes,
}

impl EncodedPart {
    /// Delimiter line and part headers, including the blank line
    pub fn head(&self) -> &Bytes {
        &self.head
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Bytes following the payload
    pub fn trailer(&self) -> &'static [u8] {
        CRLF
    }

    /// Total encoded length
    pub fn encoded_len(&self) -> usize {
        self.head.len() + self.payload.len() + CRLF.len()
    }

    /// Copy the part into one contiguous buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(&self.head);
        buf.put_slice(&self.payload);
        buf.put_slice(CRLF);
        buf.freeze()
    }
}

/// A part recovered by [`MultipartDecoder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPart {
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Incremental parser for a multipart stream body
#[derive(Debug, Clone)]
pub struct MultipartDecoder {
    delimiter: String,
}

impl MultipartDecoder {
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{}", boundary),
        }
    }

    /// Parse the next complete part from `buf`
    ///
    /// Returns `Ok(None)` when more bytes are needed; nothing is consumed in
    /// that case.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<DecodedPart>, DecodeError> {
        // Tolerate a CRLF before the delimiter, as some encoders emit
        let skip = if buf.starts_with(CRLF) { CRLF.len() } else { 0 };

        let Some(head_end) = find_subsequence(&buf[skip..], b"\r\n\r\n") else {
            return Ok(None);
        };
        let head = &buf[skip..skip + head_end];
        let head = std::str::from_utf8(head)
            .map_err(|_| DecodeError::InvalidHeader(String::from_utf8_lossy(head).into_owned()))?;

        let mut lines = head.split("\r\n");
        let delimiter = lines.next().unwrap_or_default();
        if delimiter != self.delimiter {
            return Err(DecodeError::MissingBoundary(delimiter.to_string()));
        }

        let mut content_type = None;
        let mut content_length = None;
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| DecodeError::InvalidHeader(line.to_string()))?;
            let value = value.trim();

            if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-length") {
                let len = value
                    .parse::<usize>()
                    .map_err(|_| DecodeError::InvalidHeader(line.to_string()))?;
                content_length = Some(len);
            }
        }
        let length = content_length.ok_or(DecodeError::MissingContentLength)?;

        let body_start = skip + head_end + 4;
        let body_end = body_start
            .checked_add(length)
            .ok_or_else(|| DecodeError::InvalidHeader(format!("Content-Length: {}", length)))?;
        let total = body_end
            .checked_add(CRLF.len())
            .ok_or_else(|| DecodeError::InvalidHeader(format!("Content-Length: {}", length)))?;

        if buf.len() < total {
            return Ok(None);
        }
        if &buf[body_end..total] != CRLF {
            return Err(DecodeError::MissingTrailer);
        }

        buf.advance(body_start);
        let data = buf.split_to(length).freeze();
        buf.advance(CRLF.len());

        Ok(Some(DecodedPart { content_type, data }))
    }
}
