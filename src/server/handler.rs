//! Request handlers
//!
//! Static routes answer with a fixed body. The stream route turns the
//! request into a [`StreamSession`] whose parts become the response body;
//! hyper pulls the next part only once the previous one has been accepted
//! by the socket.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures::Stream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;

use super::config::ServerConfig;
use super::transport::LinkStatus;
use crate::buffer::FrameBuffer;
use crate::protocol::constants::{DISCARD_BODY_TIMEOUT, MAX_DISCARDED_BODY};
use crate::protocol::MultipartEncoder;
use crate::session::{SessionContext, SessionEnd, StreamSession};
use crate::stats::ServerMetrics;

/// State shared by every connection of one server instance
pub(crate) struct Shared {
    pub config: ServerConfig,
    pub buffer: Arc<FrameBuffer>,
    pub encoder: MultipartEncoder,
    pub stream_content_type: HeaderValue,
    pub metrics: Arc<ServerMetrics>,
    pub connection_semaphore: Option<Arc<Semaphore>>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,
}

/// Per-connection details attached to every request
#[derive(Debug, Clone)]
pub(crate) struct ViewerInfo {
    pub session_id: u64,
    pub peer_addr: SocketAddr,
    pub link: Arc<LinkStatus>,
}

fn is_read(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Read and drop whatever request body the client sent
///
/// Closing a socket with unread input makes the kernel send a reset, which
/// can destroy the response before the client reads it.
async fn discard_body(body: Body) {
    let _ = tokio::time::timeout(
        DISCARD_BODY_TIMEOUT,
        axum::body::to_bytes(body, MAX_DISCARDED_BODY),
    )
    .await;
}

pub(crate) async fn method_not_allowed(request: Request) -> Response {
    tracing::debug!(
        method = %request.method(),
        path = request.uri().path(),
        "Method not allowed"
    );
    discard_body(request.into_body()).await;

    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, HEAD")],
        "Method Not Allowed",
    )
        .into_response()
}

/// Answer with a fixed body
pub(crate) async fn fixed(request: Request, content_type: HeaderValue, body: Bytes) -> Response {
    if !is_read(request.method()) {
        return method_not_allowed(request).await;
    }

    let head = request.method() == Method::HEAD;
    discard_body(request.into_body()).await;

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
    ];
    let body = if head { Body::empty() } else { Body::from(body) };
    (headers, body).into_response()
}

/// Open a live stream for one viewer
pub(crate) async fn stream(
    State(shared): State<Arc<Shared>>,
    Extension(viewer): Extension<ViewerInfo>,
    request: Request,
) -> Response {
    if !is_read(request.method()) {
        return method_not_allowed(request).await;
    }

    let headers = [
        (header::CONTENT_TYPE, shared.stream_content_type.clone()),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
    ];
    if request.method() == Method::HEAD {
        return headers.into_response();
    }

    // Held by the body for the lifetime of the session
    let permit = match shared.connection_semaphore.clone() {
        Some(sem) => match sem.try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %viewer.peer_addr, "Stream rejected: limit reached");
                shared.metrics.connection_rejected();
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::CONTENT_TYPE, "text/plain")],
                    "Too many viewers",
                )
                    .into_response();
            }
        },
        None => None,
    };

    let context = SessionContext::new(viewer.session_id, viewer.peer_addr, request.uri().path());
    let session = StreamSession::new(
        context,
        Arc::clone(&shared.buffer),
        shared.encoder.clone(),
        &shared.config,
        shared.cancel.child_token(),
    );

    shared.metrics.session_started();
    tracing::info!(
        session_id = viewer.session_id,
        peer = %viewer.peer_addr,
        active = shared.metrics.active_sessions(),
        "Viewer connected"
    );

    let body = ViewerBody {
        session,
        link: viewer.link,
        metrics: Arc::clone(&shared.metrics),
        _permit: permit,
        _tracked: shared.tracker.token(),
    };
    (headers, Body::from_stream(body.into_stream())).into_response()
}

/// Response body of one streaming session
///
/// hyper drops the body when the stream ends or the connection fails, so
/// the session is accounted for exactly once, in `Drop`.
struct ViewerBody {
    session: StreamSession,
    link: Arc<LinkStatus>,
    metrics: Arc<ServerMetrics>,
    _permit: Option<OwnedSemaphorePermit>,
    _tracked: TaskTrackerToken,
}

impl ViewerBody {
    fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures::stream::unfold(self, |mut body| async move {
            let part = body.session.next_part().await?;
            Some((Ok(part), body))
        })
    }
}

impl Drop for ViewerBody {
    fn drop(&mut self) {
        let end = self.link.failure().unwrap_or(SessionEnd::ClientClosed);
        let report = self.session.finish(end);

        self.metrics.session_finished(&report.stats);
        tracing::info!(
            session_id = report.context.session_id,
            peer = %report.context.peer_addr,
            end = ?report.end,
            frames_sent = report.stats.frames_sent,
            active = self.metrics.active_sessions(),
            "Viewer disconnected"
        );
    }
}
