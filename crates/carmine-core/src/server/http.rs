//! HTTP hosting using Axum.
//!
//! A request frame is POSTed to the invoke path and the response frame comes
//! back as the body. When the dispatcher produces nothing the server answers
//! `400 Bad Request` with an empty body.

use super::dispatcher::Dispatcher;
use crate::config::{ServerConfig, WireConfig};
use crate::error::{CarmineError, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router serving `invoke_path` and the health check.
pub fn router(dispatcher: Dispatcher, invoke_path: &str) -> Router {
    Router::new()
        .route(ServerConfig::HEALTH_PATH, get(handle_health))
        .route(invoke_path, post(handle_invoke))
        .layer(DefaultBodyLimit::max(
            WireConfig::FRAME_HEADER_LEN + WireConfig::MAX_MESSAGE_SIZE,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_invoke(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    match dispatcher.process_request(&body).await {
        Some(frame) => (
            [(header::CONTENT_TYPE, WireConfig::CONTENT_TYPE)],
            frame,
        )
            .into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Handle to a running HTTP server. Dropping shuts it down.
pub struct HttpServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl HttpServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Endpoint URL clients should use, e.g. `http://127.0.0.1:8080/carmine`.
    pub fn endpoint(&self, invoke_path: &str) -> String {
        format!("http://{}{}", self.addr, invoke_path)
    }

    /// Stop accepting requests; in-flight requests are allowed to finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the server task has exited.
    pub async fn join(mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Start the HTTP server.
///
/// Pass port 0 to let the OS pick one; the bound address is available from
/// the returned handle.
pub async fn start_http_server(
    dispatcher: Dispatcher,
    host: &str,
    port: u16,
    invoke_path: &str,
) -> Result<HttpServerHandle> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| CarmineError::Config {
            message: format!("invalid listen address {}:{}: {}", host, port, e),
        })?;

    let app = router(dispatcher, invoke_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}{}", actual_addr, invoke_path);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task_handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP server error: {}", e);
        }
        info!("HTTP server on {} stopped", actual_addr);
    });

    Ok(HttpServerHandle {
        addr: actual_addr,
        shutdown_tx: Some(shutdown_tx),
        task_handle: Some(task_handle),
    })
}
