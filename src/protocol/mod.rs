//! Wire formats
//!
//! - Multipart MJPEG part encoding and decoding (`multipart`)
//! - HTTP/1.1 chunked body decoding for raw-socket consumers (`chunked`)
//!
//! Everything here is pure byte manipulation. HTTP itself (request parsing,
//! response heads, transfer coding) is handled by hyper in `server`.

pub mod chunked;
pub mod constants;
pub mod multipart;

pub use chunked::{Chunk, ChunkedDecoder};
pub use multipart::{DecodedPart, EncodedPart, MultipartDecoder, MultipartEncoder};

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
