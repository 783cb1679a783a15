//! The body type every response this proxy writes is boxed into, plus
//! [`TeeBody`], the streaming body wrapper that feeds a [`BoundedTee`] as it
//! forwards frames to the client.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use cachefik_cache::BoundedTee;
use http_body::{Body, Frame};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use pin_project_lite::pin_project;

/// The single body type used for every response this proxy writes, whether
/// it's a buffered JSON error, a replayed cache hit, or a streamed upstream
/// response.
pub type ResponseBody = BoxBody<Bytes, std::io::Error>;

pub fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into()).map_err(|never: std::convert::Infallible| match never {}).boxed()
}

pin_project! {
    /// Wraps an upstream body, tee-ing every data frame into a [`BoundedTee`]
    /// as it's forwarded. On graceful completion, `on_complete` is invoked
    /// with the buffered bytes and whether the cap was exceeded; the
    /// dispatcher uses this to conditionally install a cache entry.
    ///
    /// If the inner body ends in error (upstream read failure) or is simply
    /// dropped before reaching end-of-stream (client-copy failure),
    /// `on_complete` never runs, so no cache entry is installed, matching the
    /// "abandon the entire operation" behavior for mid-stream failures.
    pub struct TeeBody<B> {
        #[pin]
        inner: B,
        tee: Option<BoundedTee>,
        on_complete: Option<Box<dyn FnOnce(Bytes, bool) + Send>>,
    }
}

impl<B> TeeBody<B> {
    pub fn new(inner: B, tee: BoundedTee, on_complete: impl FnOnce(Bytes, bool) + Send + 'static) -> Self {
        Self { inner, tee: Some(tee), on_complete: Some(Box::new(on_complete)) }
    }
}

impl<B> Body for TeeBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<std::io::Error>,
{
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.project();

        match this.inner.poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(tee)) = (frame.data_ref(), this.tee.as_mut()) {
                    tee.write(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                // Upstream read failed mid-stream: the status line is already
                // committed, so there's nothing left to tell the client.
                // Drop the tee buffer without invoking `on_complete`.
                this.tee.take();
                this.on_complete.take();
                Poll::Ready(Some(Err(err.into())))
            }
            Poll::Ready(None) => {
                if let (Some(tee), Some(callback)) = (this.tee.take(), this.on_complete.take()) {
                    let (buffered, exceeded) = tee.into_parts();
                    callback(buffered, exceeded);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
