// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! HTTP relay for a JPEG pull sink.
//!
//! `GET /` serves a static viewer page; `GET /stream` answers with
//! `multipart/x-mixed-replace` and keeps pulling JPEG samples for as long as
//! the client stays connected. Every connection runs its own pull loop, so
//! two viewers may see different frames.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::{PullSink, Result, StreamError};

/// Multipart boundary token.
pub const MULTIPART_BOUNDARY: &str = "frame";

const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Bounded so a closed relay is noticed promptly.
const RELAY_PULL_TIMEOUT: Duration = Duration::from_millis(100);
const RELAY_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// How long open streams get to finish once shutdown starts. A client that
/// stopped reading never lets its response complete, so the wait is bounded.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>streamview</title>
<style>
body {
  margin: 0; background: #111; height: 100vh;
  display: flex; align-items: center; justify-content: center;
}
img { max-width: 100%; max-height: 100%; }
</style>
</head>
<body>
<img src="/stream" alt="live stream">
</body>
</html>
"#;

/// Listen address for the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpRelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// One multipart part carrying a JPEG image.
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let mut chunk = BytesMut::with_capacity(jpeg.len() + 64);
    chunk.put_slice(b"--");
    chunk.put_slice(MULTIPART_BOUNDARY.as_bytes());
    chunk.put_slice(b"\r\nContent-Type: image/jpeg\r\n\r\n");
    chunk.put_slice(jpeg);
    chunk.put_slice(b"\r\n");
    chunk.freeze()
}

/// Route state shared by every connection of one relay.
#[derive(Clone)]
pub struct HttpRelaySession {
    sink: Arc<dyn PullSink>,
    closed: Arc<AtomicBool>,
    clients: Arc<AtomicUsize>,
}

impl HttpRelaySession {
    /// Bind and start serving `sink` on a dedicated thread.
    ///
    /// Bind failures are returned here, before any thread is spawned.
    pub fn start(sink: Arc<dyn PullSink>, config: &HttpRelayConfig) -> Result<HttpRelayHandle> {
        let addr = (config.host.as_str(), config.port);
        let listener = std::net::TcpListener::bind(addr).map_err(|e| {
            StreamError::Configuration(format!(
                "Failed to bind HTTP relay to {}:{}: {}",
                config.host, config.port, e
            ))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("streamview-http-worker")
            .enable_all()
            .build()?;

        let session = HttpRelaySession {
            sink,
            closed: Arc::new(AtomicBool::new(false)),
            clients: Arc::new(AtomicUsize::new(0)),
        };
        let app = session.router();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let thread = std::thread::Builder::new()
            .name("streamview-http".into())
            .spawn(move || {
                runtime.block_on(serve_until_shutdown(listener, app, shutdown_rx));
                // Connection tasks still parked on stalled clients are dropped here.
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            })?;

        tracing::info!("[HTTP] Relay running on http://{}", local_addr);
        Ok(HttpRelayHandle {
            session,
            local_addr,
            shutdown_tx,
            thread: Some(thread),
        })
    }

    fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG));

        Router::new()
            .route("/", get(index))
            .route("/stream", get(stream))
            .layer(trace_layer)
            .with_state(self.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Streaming connections currently open.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    /// Pull the next JPEG, waiting as long as the relay is open.
    /// `None` once the relay closes or the sink reaches end-of-stream.
    async fn next_jpeg(&self) -> Option<Bytes> {
        loop {
            if self.is_closed() {
                return None;
            }
            let sink = Arc::clone(&self.sink);
            let pulled =
                tokio::task::spawn_blocking(move || sink.try_pull(RELAY_PULL_TIMEOUT)).await;
            match pulled {
                Ok(Ok(Some(sample))) => return Some(sample.data),
                Ok(Ok(None)) => {
                    if self.sink.is_end_of_stream() {
                        return None;
                    }
                }
                Ok(Err(e)) => {
                    tracing::debug!("[HTTP] Pull failed: {}", e);
                    tokio::time::sleep(RELAY_ERROR_BACKOFF).await;
                }
                Err(e) => {
                    tracing::warn!("[HTTP] Pull task failed: {}", e);
                    return None;
                }
            }
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        // A dropped sender also means shut down.
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Serve until shutdown is signalled, then give open streams
/// [`SHUTDOWN_GRACE`] to end before abandoning them.
async fn serve_until_shutdown(
    listener: std::net::TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
) {
    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("[HTTP] Relay listener setup failed: {}", e);
            return;
        }
    };
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()));
    let deadline = async {
        wait_for_shutdown(shutdown).await;
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    tokio::select! {
        served = serve.into_future() => {
            if let Err(e) = served {
                tracing::error!("[HTTP] Relay stopped with error: {}", e);
            }
        }
        _ = deadline => {
            tracing::warn!(
                "[HTTP] Streams still open {:?} after shutdown, dropping them",
                SHUTDOWN_GRACE
            );
        }
    }
}

/// Decrements the client count when a stream body is dropped.
struct ClientGuard {
    session: HttpRelaySession,
}

impl ClientGuard {
    fn new(session: HttpRelaySession) -> Self {
        let clients = session.clients.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("[HTTP] Client connected ({} active)", clients);
        Self { session }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let clients = self.session.clients.fetch_sub(1, Ordering::Relaxed) - 1;
        tracing::info!("[HTTP] Client disconnected ({} active)", clients);
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn stream(State(session): State<HttpRelaySession>) -> impl IntoResponse {
    let guard = ClientGuard::new(session);
    let parts = futures_util::stream::unfold(guard, |guard| async move {
        let jpeg = guard.session.next_jpeg().await?;
        Some((Ok::<_, std::io::Error>(multipart_chunk(&jpeg)), guard))
    });

    (
        [
            (header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, private"),
        ],
        Body::from_stream(parts),
    )
}

/// Running relay. Stopping closes every stream, shuts the server down and
/// joins its thread.
pub struct HttpRelayHandle {
    session: HttpRelaySession,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for HttpRelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRelayHandle")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl HttpRelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn session(&self) -> &HttpRelaySession {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.session.closed.store(true, Ordering::Release);
        self.shutdown_tx.send_replace(true);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("[HTTP] Relay thread panicked");
            }
            tracing::info!("[HTTP] Relay on {} stopped", self.local_addr);
        }
    }
}

impl Drop for HttpRelayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
