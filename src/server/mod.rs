//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler
//! function. Persistent connections (keep-alive) and pipelined requests are
//! supported. Each request runs in its own task so a panicking handler costs
//! one `500` response instead of the connection task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_MAX_CONTENT_LENGTH;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use vitrina::server::Server;
/// use vitrina::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(|_req: Request| async {
///         Response::new(StatusCode::Ok).body("Hello!")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_request_size: usize,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            max_request_size: DEFAULT_MAX_CONTENT_LENGTH,
        })
    }

    /// Caps how many bytes a single request may occupy; larger requests get `413`.
    #[must_use]
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections and dispatches requests to `handler` until the
    /// process is terminated.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stops accepting new connections once
    /// `shutdown` resolves. Connections already accepted finish on their own
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener itself fails.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        let max_request_size = self.max_request_size;
        info!(address = %self.local_addr, "vitrina listening");

        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                () = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
            };

            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) =
                    handle_connection(stream, peer_addr, handler, max_request_size).await
                {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Body sent when a handler panics instead of returning a response.
fn critical_error_response() -> Response {
    Response::json(
        StatusCode::InternalServerError,
        &json!({
            "error": "Critical server error",
            "message": "Contact the administrator",
        }),
    )
    .header("Access-Control-Allow-Origin", "*")
}

// Runs the handler on its own task so a panic surfaces as a `JoinError`.
async fn dispatch<H, F>(handler: &Arc<H>, request: Request) -> Response
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let handler = Arc::clone(handler);
    match tokio::spawn(async move { handler(request).await }).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "request handler failed");
            critical_error_response()
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, serving every
/// complete request in the buffer, until the peer closes the connection or
/// signals `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    max_request_size: usize,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        // Serve whatever is already buffered before reading again, so
        // pipelined requests do not wait on the socket.
        let mut too_large = buf.len() > max_request_size;
        let parsed = if buf.is_empty() {
            None
        } else {
            match Request::parse(&buf) {
                Ok(parsed) => {
                    too_large = parsed.total_len > max_request_size;
                    Some(parsed)
                }
                Err(RequestError::Incomplete) => None,
                Err(RequestError::TooLarge { .. }) => {
                    too_large = true;
                    None
                }
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "bad request — sending 400");
                    let response = Response::new(StatusCode::BadRequest)
                        .body(format!("Bad Request: {e}"))
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    break;
                }
            }
        };

        if too_large {
            warn!(peer = %peer_addr, limit = max_request_size, "request too large — sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        let parsed = match parsed {
            Some(parsed) if parsed.is_complete(buf.len()) => parsed,
            _ => {
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                continue;
            }
        };

        let total_len = parsed.total_len;
        let request = parsed.request.with_remote_addr(peer_addr);
        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = dispatch(&handler, request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_len);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close — shutting down");
            break;
        }
    }

    Ok(())
}
