//! Response capture.
//!
//! # Responsibilities
//! - Record the first status code set on a response
//! - Count every body byte handed to the client
//! - Keep a completion guard alive until the body finishes streaming
//!
//! # Design Decisions
//! - Pass-through: frames are forwarded untouched, nothing is buffered
//! - Status is write-once; later writes are ignored
//! - Counters are atomics so the capture can be shared with the guard

use std::pin::Pin;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::Response;
use http_body::{Body as HttpBody, Frame, SizeHint};

/// Captured `(status, bytes_written)` for one request.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: AtomicU16,
    bytes: AtomicU64,
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` unless one was already recorded.
    pub fn set_status(&self, status: StatusCode) {
        let _ = self
            .status
            .compare_exchange(0, status.as_u16(), Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::AcqRel);
    }

    /// Status recorded so far, 200 if none was set.
    pub fn status(&self) -> u16 {
        match self.status.load(Ordering::Acquire) {
            0 => StatusCode::OK.as_u16(),
            s => s,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Record the response status and route its body through a counting wrapper.
    ///
    /// `guard` is dropped once the body reaches its end or is itself dropped.
    pub fn wrap<G>(self: &Arc<Self>, response: Response, guard: G) -> Response
    where
        G: Send + Unpin + 'static,
    {
        self.set_status(response.status());
        let (parts, body) = response.into_parts();
        let body = CaptureBody {
            inner: body,
            capture: Arc::clone(self),
            guard: Some(guard),
        };
        Response::from_parts(parts, Body::new(body))
    }
}

/// Body wrapper that counts data bytes as they are polled.
pub struct CaptureBody<G> {
    inner: Body,
    capture: Arc<ResponseCapture>,
    guard: Option<G>,
}

impl<G> HttpBody for CaptureBody<G>
where
    G: Unpin,
{
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.capture.add_bytes(data.len() as u64);
                }
            }
            Poll::Ready(None) => {
                this.guard.take();
            }
            Poll::Ready(Some(Err(_))) | Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
