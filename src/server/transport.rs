//! Connection transport with a bounded write time
//!
//! hyper drives the socket, so stalls are detected here: a write, flush or
//! shutdown that stays pending for longer than the write timeout fails with
//! `TimedOut`. The first failure is recorded in a [`LinkStatus`] the session
//! reads when it ends.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

use crate::session::SessionEnd;

/// First transport failure seen on a connection
#[derive(Debug, Default)]
pub(crate) struct LinkStatus {
    failure: OnceLock<SessionEnd>,
}

impl LinkStatus {
    pub fn record(&self, end: SessionEnd) {
        let _ = self.failure.set(end);
    }

    pub fn failure(&self) -> Option<SessionEnd> {
        self.failure.get().copied()
    }
}

pub(crate) struct TimedStream<T> {
    inner: T,
    write_timeout: Duration,
    /// Armed while a write is pending
    stall: Option<Pin<Box<Sleep>>>,
    link: Arc<LinkStatus>,
}

impl<T> TimedStream<T> {
    pub fn new(inner: T, write_timeout: Duration, link: Arc<LinkStatus>) -> Self {
        Self {
            inner,
            write_timeout,
            stall: None,
            link,
        }
    }

    fn guard<R>(&mut self, cx: &mut Context<'_>, poll: Poll<io::Result<R>>) -> Poll<io::Result<R>> {
        match poll {
            Poll::Ready(Ok(value)) => {
                self.stall = None;
                Poll::Ready(Ok(value))
            }
            Poll::Ready(Err(e)) => {
                self.stall = None;
                self.link.record(SessionEnd::WriteFailed(e.kind()));
                Poll::Ready(Err(e))
            }
            Poll::Pending => {
                let timeout = self.write_timeout;
                let stall = self
                    .stall
                    .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                if stall.as_mut().poll(cx).is_pending() {
                    return Poll::Pending;
                }

                self.stall = None;
                self.link.record(SessionEnd::WriteTimeout);
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write timed out",
                )))
            }
        }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TimedStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TimedStream<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        this.guard(cx, poll)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        this.guard(cx, poll)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_flush(cx);
        this.guard(cx, poll)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_shutdown(cx);
        this.guard(cx, poll)
    }
}
