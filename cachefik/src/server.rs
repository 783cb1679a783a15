use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto;
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Sleep;

use crate::dispatcher::{dispatch, AppState};

/// Bind `addr` and serve accepted connections until the process receives a
/// termination signal. One task per connection; each connection serves
/// requests one at a time under HTTP/1.1 (no pipelining).
///
/// `read_timeout`/`write_timeout` bound how long a connection may go without
/// making read or write progress; each is enforced independently and resets
/// on every successful read or write, rather than bounding the connection's
/// total lifetime.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    read_timeout: Duration,
    write_timeout: Duration,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state, read_timeout, write_timeout).await
}

/// Serve accepted connections on an already-bound listener. Split out from
/// [`serve`] so tests can bind an ephemeral port (`127.0.0.1:0`), read back
/// the address the OS actually assigned, and only then start accepting.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    read_timeout: Duration,
    write_timeout: Duration,
) -> std::io::Result<()> {
    log::info!("listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        log::warn!("failed to accept connection: {err}");
                        continue;
                    }
                };

                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    serve_connection(stream, peer_addr, state, read_timeout, write_timeout).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("received shutdown signal, stopping accept loop");
                return Ok(());
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    read_timeout: Duration,
    write_timeout: Duration,
) {
    let io = TokioIo::new(TimeoutIo::new(stream, read_timeout, write_timeout));

    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { Ok::<_, std::convert::Infallible>(dispatch(state, req, peer_addr).await) }
    });

    let conn = auto::Builder::new(hyper_util::rt::TokioExecutor::new()).serve_connection(io, service);

    match conn.await {
        Ok(()) => {}
        Err(err) => log::debug!("connection from {peer_addr} ended with error: {err}"),
    }
}

pin_project! {
    /// Wraps a TCP stream with independent read and write deadlines. Each
    /// deadline resets to `now + timeout` the moment its side makes any
    /// progress, so a connection that's merely idle between requests (or
    /// slow to drain a large response) isn't cut off by the other side's
    /// clock the way a single whole-connection timeout would.
    struct TimeoutIo<S> {
        #[pin]
        inner: S,
        read_timeout: Duration,
        write_timeout: Duration,
        #[pin]
        read_deadline: Sleep,
        #[pin]
        write_deadline: Sleep,
    }
}

impl<S> TimeoutIo<S> {
    fn new(inner: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
            read_deadline: tokio::time::sleep(read_timeout),
            write_deadline: tokio::time::sleep(write_timeout),
        }
    }
}

fn timed_out(which: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::TimedOut, format!("{which} timeout exceeded"))
}

impl<S: AsyncRead> AsyncRead for TimeoutIo<S> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let mut this = self.project();

        if this.read_deadline.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(timed_out("read")));
        }

        let before = buf.filled().len();
        match this.inner.poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    this.read_deadline.reset(tokio::time::Instant::now() + *this.read_timeout);
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

impl<S: AsyncWrite> AsyncWrite for TimeoutIo<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let mut this = self.project();

        if this.write_deadline.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(timed_out("write")));
        }

        match this.inner.poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                if n > 0 {
                    this.write_deadline.reset(tokio::time::Instant::now() + *this.write_timeout);
                }
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}
