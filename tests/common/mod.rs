//! Test viewer speaking just enough HTTP to consume an MJPEG stream

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use mjpeg_rs::protocol::{Chunk, ChunkedDecoder, MultipartDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Viewer {
    stream: TcpStream,
    pub head: String,
    chunked: bool,
    raw: BytesMut,
    body: BytesMut,
    parts: MultipartDecoder,
    chunks: ChunkedDecoder,
    ended: bool,
}

impl Viewer {
    pub async fn connect(addr: SocketAddr, path: &str) -> Self {
        Self::connect_with(addr, path, "HTTP/1.1").await
    }

    pub async fn connect_with(addr: SocketAddr, path: &str, version: &str) -> Self {
        Self::open(addr, path, version, false).await
    }

    /// Send the request, then shut down the write half before reading
    pub async fn connect_half_closed(addr: SocketAddr, path: &str) -> Self {
        Self::open(addr, path, "HTTP/1.1", true).await
    }

    async fn open(addr: SocketAddr, path: &str, version: &str, half_close: bool) -> Self {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} {}\r\nHost: test\r\n\r\n", path, version);
        stream.write_all(request.as_bytes()).await.unwrap();
        if half_close {
            stream.shutdown().await.unwrap();
        }

        let mut raw = BytesMut::new();
        let head = tokio::time::timeout(READ_TIMEOUT, async {
            loop {
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = raw.split_to(pos + 4);
                    break String::from_utf8(head.to_vec()).unwrap();
                }
                let n = stream.read_buf(&mut raw).await.unwrap();
                assert!(n > 0, "connection closed before response head");
            }
        })
        .await
        .expect("response head");

        let boundary = head
            .split("boundary=")
            .nth(1)
            .and_then(|rest| rest.split("\r\n").next())
            .unwrap_or("myboundary")
            .to_string();

        let chunked = head
            .to_ascii_lowercase()
            .contains("transfer-encoding: chunked");

        Self {
            chunked,
            stream,
            head,
            raw,
            body: BytesMut::new(),
            parts: MultipartDecoder::new(&boundary),
            chunks: ChunkedDecoder::new(),
            ended: false,
        }
    }

    /// Value of response header `name`, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.split("\r\n").skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    /// Next frame payload, or `None` once the server ends the stream
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        tokio::time::timeout(READ_TIMEOUT, self.next_frame_inner())
            .await
            .expect("timed out waiting for a frame")
    }

    async fn next_frame_inner(&mut self) -> Option<Bytes> {
        loop {
            if let Some(part) = self.parts.decode(&mut self.body).unwrap() {
                assert_eq!(part.content_type.as_deref(), Some("image/jpeg"));
                return Some(part.data);
            }
            if self.ended {
                return None;
            }

            if self.chunked {
                match self.chunks.decode(&mut self.raw).unwrap() {
                    Some(Chunk::Data(data)) => {
                        self.body.extend_from_slice(&data);
                        continue;
                    }
                    Some(Chunk::End) => {
                        self.ended = true;
                        continue;
                    }
                    None => {}
                }
            } else {
                let pending = self.raw.split();
                self.body.extend_from_slice(&pending);
            }

            match self.stream.read_buf(&mut self.raw).await {
                Ok(0) | Err(_) => self.ended = true,
                Ok(_) => {}
            }
        }
    }

    /// Read until the server closes the connection
    pub async fn wait_closed(&mut self) {
        tokio::time::timeout(READ_TIMEOUT, async {
            let mut scratch = [0u8; 4096];
            loop {
                match self.stream.read(&mut scratch).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await
        .expect("server did not close the connection");
    }
}

/// A JPEG-looking payload of `len` bytes filled with `fill`
pub fn jpeg(fill: u8, len: usize) -> Vec<u8> {
    let mut data = vec![fill; len];
    data[0] = 0xFF;
    data[1] = 0xD8;
    data[len - 2] = 0xFF;
    data[len - 1] = 0xD9;
    data
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
