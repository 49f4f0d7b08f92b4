//! In-process HTTP servers for WHIP client tests
//!
//! - [`TestServer`] serves any axum router on a random local port
//! - [`ScriptedWhip`] answers WHIP requests with scripted statuses and
//!   records every request it sees
//! - [`StallingWhip`] accepts an offer, sends the headers, then stalls the
//!   answer body

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// An axum router bound to `127.0.0.1:0`
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    pub async fn start(router: Router) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL without trailing slash, e.g. `http://127.0.0.1:40123`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

/// How the scripted endpoint answers
#[derive(Debug, Clone)]
pub struct WhipScript {
    pub post_status: u16,
    pub location: Option<String>,
    /// Fixed answer body; `None` echoes the offer
    pub answer: Option<String>,
    pub delete_status: u16,
    pub post_delay: Duration,
}

impl Default for WhipScript {
    fn default() -> Self {
        Self {
            post_status: 201,
            location: Some("/whip/publish/abc123".to_string()),
            answer: None,
            delete_status: 204,
            post_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

struct ScriptState {
    script: WhipScript,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// WHIP endpoint with scripted responses
pub struct ScriptedWhip {
    server: TestServer,
    state: Arc<ScriptState>,
}

impl ScriptedWhip {
    pub async fn start(script: WhipScript) -> anyhow::Result<Self> {
        let state = Arc::new(ScriptState {
            script,
            requests: Mutex::new(Vec::new()),
        });
        let router = Router::new().fallback(handle).with_state(state.clone());
        let server = TestServer::start(router).await?;
        Ok(Self { server, state })
    }

    pub fn publish_url(&self) -> String {
        self.server.url("/whip/publish")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.server.shutdown().await
    }
}

async fn handle(
    State(state): State<Arc<ScriptState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: body.clone(),
    });

    let script = &state.script;
    let mut builder = Response::builder();

    let body = match method {
        Method::POST => {
            if !script.post_delay.is_zero() {
                tokio::time::sleep(script.post_delay).await;
            }
            builder = builder.status(script.post_status);
            if let Some(location) = &script.location {
                builder = builder.header(header::LOCATION, location);
            }
            if (200..300).contains(&script.post_status) {
                builder = builder.header(header::CONTENT_TYPE, "application/sdp");
                script.answer.clone().unwrap_or(body)
            } else {
                "offer rejected".to_string()
            }
        }
        Method::DELETE => {
            builder = builder.status(script.delete_status);
            if (200..300).contains(&script.delete_status) {
                String::new()
            } else {
                "teardown failed".to_string()
            }
        }
        _ => {
            builder = builder.status(StatusCode::METHOD_NOT_ALLOWED);
            String::new()
        }
    };

    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Raw HTTP/1.1 endpoint whose POST answer never finishes
///
/// The POST reply announces a body longer than what is sent, then holds
/// the connection open. DELETE requests are answered `204` and recorded.
pub struct StallingWhip {
    addr: SocketAddr,
    deleted: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl StallingWhip {
    pub async fn start(location: &str, stall: Duration) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let location = location.to_string();

        let recorded = deleted.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_stalling(
                    stream,
                    location.clone(),
                    stall,
                    recorded.clone(),
                ));
            }
        });

        Ok(Self {
            addr,
            deleted,
            handle,
        })
    }

    pub fn publish_url(&self) -> String {
        format!("http://{}/whip/publish", self.addr)
    }

    /// Paths that received a DELETE
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

impl Drop for StallingWhip {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_stalling(
    mut stream: TcpStream,
    location: String,
    stall: Duration,
    deleted: Arc<Mutex<Vec<String>>>,
) -> anyhow::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    if method == "DELETE" {
        deleted.lock().push(path);
        stream
            .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
            .await?;
        return Ok(());
    }

    let reply = format!(
        "HTTP/1.1 201 Created\r\nLocation: {}\r\nContent-Type: application/sdp\r\nContent-Length: 4096\r\n\r\nv=0\r\n",
        location
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.flush().await?;
    tokio::time::sleep(stall).await;
    Ok(())
}
