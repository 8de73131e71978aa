//! HTTP server implementation.
//!
//! Built on Hyper and Tokio. The server consists of:
//!
//! - a TCP listener bound to the configured address
//! - one task per connection, serving HTTP/1.1
//! - per-request admission through the [`Coordinator`]
//! - graceful shutdown: stop accepting, let connections finish, drain
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskd_server::{Server, ServerConfig};
//! use taskd_service::ItemService;
//! use taskd_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ItemService::new(Arc::new(MemoryStore::new()));
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:8080").build();
//!
//!     let report = Server::new(config, service).bind().await?.run().await?;
//!     println!("abandoned {} requests", report.abandoned);
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http::{Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use taskd_core::{classify, ItemError, RequestContext};
use taskd_service::ItemService;
use taskd_telemetry::metrics::{record_classified_error, record_request};

use crate::api::{self, HttpResponse};
use crate::config::ServerConfig;
use crate::coordinator::{Coordinator, DrainReport};
use crate::health::{HealthCheck, ReadinessStatus};
use crate::router::{route, Operation, RouteMatch};
use crate::shutdown::ShutdownSignal;

/// Label used in metrics for requests that matched no route.
const UNMATCHED_OPERATION: &str = "unmatched";

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to the configured address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared by every connection task.
#[derive(Debug)]
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) service: ItemService,
    pub(crate) coordinator: Coordinator,
    pub(crate) health: HealthCheck,
}

/// The taskd HTTP server, before binding.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use taskd_server::{LifecycleState, Server, ServerConfig};
/// use taskd_service::ItemService;
/// use taskd_store::MemoryStore;
///
/// let service = ItemService::new(Arc::new(MemoryStore::new()));
/// let server = Server::new(ServerConfig::default(), service);
///
/// assert_eq!(server.coordinator().state(), LifecycleState::Starting);
/// ```
#[derive(Debug)]
pub struct Server {
    state: Arc<ServerState>,
}

impl Server {
    /// Creates a server for `service`.
    #[must_use]
    pub fn new(config: ServerConfig, service: ItemService) -> Self {
        let health = HealthCheck::new(config.service_name(), config.service_version());
        Self {
            state: Arc::new(ServerState {
                config,
                service,
                coordinator: Coordinator::new(),
                health,
            }),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Returns a handle to the lifecycle coordinator.
    #[must_use]
    pub fn coordinator(&self) -> Coordinator {
        self.state.coordinator.clone()
    }

    /// Binds the listener and starts accepting requests.
    ///
    /// Binding to port 0 picks a free port; see [`BoundServer::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidAddress` or `ServerError::Bind`.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let configured = self.state.config.http_addr();
        let addr = self
            .state
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: configured.to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        self.state.coordinator.mark_accepting();
        tracing::info!(addr = %local_addr, "server listening");

        Ok(BoundServer {
            listener,
            local_addr,
            state: self.state,
        })
    }
}

/// A server whose listener is bound.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
}

impl BoundServer {
    /// Returns the address actually bound.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle to the lifecycle coordinator.
    #[must_use]
    pub fn coordinator(&self) -> Coordinator {
        self.state.coordinator.clone()
    }

    /// Serves until SIGTERM or SIGINT, then drains.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; the `Result` leaves room for
    /// listener failures that should abort the process.
    pub async fn run(self) -> Result<DrainReport, ServerError> {
        self.serve(ShutdownSignal::with_os_signals()).await
    }

    /// Serves until `shutdown` fires, then drains.
    ///
    /// On shutdown the listener is closed, open connections are told to
    /// finish their current request and close, and admitted requests get up
    /// to the configured shutdown timeout to complete.
    ///
    /// # Errors
    ///
    /// See [`BoundServer::run`].
    pub async fn serve(self, shutdown: ShutdownSignal) -> Result<DrainReport, ServerError> {
        let Self {
            listener,
            local_addr,
            state,
        } = self;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let state = Arc::clone(&state);
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                serve_connection(state, stream, remote_addr, shutdown).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!(addr = %local_addr, "shutdown requested, no longer accepting");
                    break;
                }
            }
        }

        drop(listener);

        let report = state
            .coordinator
            .drain(state.config.shutdown_timeout())
            .await;

        tracing::info!(abandoned = report.abandoned, "server stopped");
        Ok(report)
    }
}

async fn serve_connection(
    state: Arc<ServerState>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    shutdown: ShutdownSignal,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let state = Arc::clone(&state);
        async move { handle_request(&state, req).await }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(remote = %remote_addr, error = %e, "connection error");
            }
        }
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.as_mut().await {
                tracing::debug!(remote = %remote_addr, error = %e, "connection error during shutdown");
            }
        }
    }
}

/// Handles one request end to end.
///
/// Probes bypass admission. Everything else is admitted through the
/// coordinator, gets a context tied to the coordinator's root token with the
/// configured deadline, and on failure goes through the classifier exactly
/// once.
pub(crate) async fn handle_request<B>(
    state: &ServerState,
    req: Request<B>,
) -> Result<HttpResponse, Infallible>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (operation, id) = match route(&method, &path) {
        RouteMatch::Matched { operation, id } => (operation, id.map(str::to_owned)),
        RouteMatch::MethodNotAllowed => {
            let response = api::message_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            return Ok(finish(UNMATCHED_OPERATION, &method, &path, started, response));
        }
        RouteMatch::NotFound => {
            let response = api::message_response(StatusCode::NOT_FOUND, "route not found");
            return Ok(finish(UNMATCHED_OPERATION, &method, &path, started, response));
        }
    };

    if operation.is_probe() {
        let response = probe_response(state, operation);
        return Ok(finish(operation.id(), &method, &path, started, response));
    }

    let Some(guard) = state.coordinator.admit() else {
        let response =
            api::message_response(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
        return Ok(finish(operation.id(), &method, &path, started, response));
    };

    let ctx = RequestContext::with_token(guard.token())
        .with_timeout(state.config.request_timeout())
        .with_operation_id(operation.id());
    // fires if hyper drops this future because the client went away
    let _disconnect = ctx.token().clone().drop_guard();

    let limit = state.config.max_body_size();
    let result = async {
        let body = tokio::select! {
            collected = Limited::new(req.into_body(), limit).collect() => collected
                .map_err(|e| body_read_error(&*e, limit))?
                .to_bytes(),
            err = ctx.done() => return Err(err),
        };
        api::dispatch(&state.service, &ctx, operation, id.as_deref(), &body)
    }
    .await;

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            let classified = classify(&ctx, &anyhow::Error::from(err));
            record_classified_error(classified.kind().as_str());
            api::error_response(&classified)
        }
    };

    tracing::debug!(request_id = %ctx.request_id(), "request finished");
    let response = finish(operation.id(), &method, &path, started, response);
    drop(guard);
    Ok(response)
}

fn body_read_error(err: &(dyn std::error::Error + Send + Sync + 'static), limit: usize) -> ItemError {
    if err.is::<LengthLimitError>() {
        ItemError::invalid_field("body", format!("must be at most {limit} bytes"))
    } else {
        ItemError::invalid_field("body", format!("failed to read body: {err}"))
    }
}

fn probe_response(state: &ServerState, operation: Operation) -> HttpResponse {
    if operation == Operation::Ready {
        let status = ReadinessStatus::from_coordinator(&state.coordinator);
        let code = if status.is_ready() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        api::json_response(code, &status).unwrap_or_else(|_| api::empty_response(code))
    } else {
        api::json_response(StatusCode::OK, &state.health.status())
            .unwrap_or_else(|_| api::empty_response(StatusCode::OK))
    }
}

fn finish(
    operation: &str,
    method: &http::Method,
    path: &str,
    started: Instant,
    response: HttpResponse,
) -> HttpResponse {
    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    record_request(operation, status, elapsed);
    tracing::debug!(
        operation,
        method = %method,
        path,
        status,
        elapsed = ?elapsed,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http::Method;
    use http_body_util::Full;
    use taskd_store::MemoryStore;

    use super::*;

    fn state() -> ServerState {
        let config = ServerConfig::builder()
            .service_name("taskd-test")
            .service_version("0.0.1")
            .build();
        let service = ItemService::new(Arc::new(MemoryStore::new()));
        let coordinator = Coordinator::new();
        coordinator.mark_accepting();
        ServerState {
            health: HealthCheck::new(config.service_name(), config.service_version()),
            config,
            service,
            coordinator,
        }
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(state: &ServerState, req: Request<Full<Bytes>>) -> (StatusCode, serde_json::Value) {
        let response = handle_request(state, req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let state = state();
        let (status, created) = send(
            &state,
            request(Method::POST, "/todos", r#"{"title":"Learn Rust"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["description"], "");

        let (status, fetched) = send(&state, request(Method::GET, "/todos/1", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
        assert_eq!(state.coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let state = state();
        let (status, body) = send(&state, request(Method::GET, "/nope", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "route not found"}));

        let (status, body) = send(&state, request(Method::DELETE, "/todos", "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, serde_json::json!({"error": "method not allowed"}));
    }

    #[tokio::test]
    async fn test_missing_item_classified_as_not_found() {
        let state = state();
        let (status, body) = send(&state, request(Method::DELETE, "/todos/9", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "todo not found"}));
    }

    #[tokio::test]
    async fn test_draining_refuses_new_work() {
        let state = state();
        state.coordinator.begin_drain();

        let (status, body) = send(&state, request(Method::GET, "/todos", "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "server is shutting down");

        let (status, body) = send(&state, request(Method::GET, "/ready", "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["state"], "draining");

        let (status, body) = send(&state, request(Method::GET, "/health", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "taskd-test");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_unparsed() {
        let mut state = state();
        state.config = ServerConfig::builder().max_body_size(64).build();

        let junk = "x".repeat(4096);
        let payload = format!(r#"{{"title":"abc","junk":"{junk}"}}"#);
        let (status, body) = send(&state, request(Method::POST, "/todos", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["body"][0], "must be at most 64 bytes");

        let (status, body) = send(&state, request(Method::GET, "/todos", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, _) = send(
            &state,
            request(Method::POST, "/todos", r#"{"title":"fits"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_expired_deadline_maps_to_gateway_timeout() {
        let mut state = state();
        state.config = ServerConfig::builder()
            .request_timeout(Duration::ZERO)
            .build();

        let (status, body) = send(&state, request(Method::GET, "/todos", "")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "context deadline exceeded");
    }

    #[tokio::test]
    async fn test_cancelled_root_maps_to_client_closed() {
        let state = state();
        let guard = state.coordinator.admit().unwrap();
        let ctx = RequestContext::with_token(guard.token());

        // a timed-out drain cancels the root every request token descends from
        let report = state.coordinator.drain(Duration::from_millis(1)).await;
        assert_eq!(report.abandoned, 1);

        let err = api::dispatch(&state.service, &ctx, Operation::ListItems, None, b"").unwrap_err();
        let classified = classify(&ctx, &anyhow::Error::from(err));
        assert_eq!(classified.status().as_u16(), 499);
        assert_eq!(classified.body().error, "context canceled");
        drop(guard);
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let service = ItemService::new(Arc::new(MemoryStore::new()));
        let config = ServerConfig::builder().http_addr("not-a-valid-address").build();
        let err = Server::new(config, service).bind().await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
        assert!(err.to_string().contains("not-a-valid-address"));
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let service = ItemService::new(Arc::new(MemoryStore::new()));
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(Duration::from_millis(100))
            .build();

        let bound = Server::new(config, service).bind().await.unwrap();
        assert_ne!(bound.local_addr().port(), 0);
        let coordinator = bound.coordinator();
        assert!(coordinator.is_accepting());

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let report = tokio::time::timeout(Duration::from_secs(5), bound.serve(shutdown))
            .await
            .expect("server should stop")
            .expect("serve should succeed");
        assert!(report.is_clean());
        assert_eq!(coordinator.state(), crate::LifecycleState::Stopped);
    }
}
