//! Encoded frame type

use bytes::Bytes;

/// One encoded still image (normally JPEG)
///
/// Cheap to clone: the payload is reference counted. Immutable once it has
/// been handed to a [`FrameBuffer`](super::FrameBuffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
    width: u32,
    height: u32,
    /// Producer-supplied capture timestamp
    timestamp: u64,
    /// Assigned by the buffer on submit, starting at 1
    sequence: u64,
}

impl Frame {
    /// Create a frame from encoded bytes
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32, timestamp: u64) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            timestamp,
            sequence: 0,
        }
    }

    /// Encoded image bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Sequence number assigned by the buffer (0 if never submitted)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(super) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}
