//! Raw TCP hosting.
//!
//! One exchange per connection: the client writes a request frame and
//! half-closes its side, the server answers with one response frame and
//! closes the connection.
//!
//! # Thread Safety
//!
//! Each connection is handled in its own spawned task. The [`Dispatcher`] is
//! cheap to clone and shares its resolver.

use super::dispatcher::Dispatcher;
use crate::config::ServerConfig;
use crate::error::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Handle to a running TCP server. Dropping shuts down the server.
pub struct TcpServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TcpServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Endpoint URL clients should use, e.g. `tcp://127.0.0.1:9000`.
    pub fn endpoint(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    /// Stop accepting new connections.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the accept loop has exited.
    pub async fn join(mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TcpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// TCP server feeding accepted connections to a [`Dispatcher`].
pub struct TcpServer;

impl TcpServer {
    /// Bind `addr` and start serving in background tokio tasks.
    pub async fn start(
        dispatcher: Dispatcher,
        addr: impl ToSocketAddrs,
    ) -> Result<TcpServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        info!("TCP server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let active_connections = Arc::new(AtomicUsize::new(0));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            dispatcher,
            shutdown_rx,
            active_connections,
        ));

        Ok(TcpServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop(
        listener: TcpListener,
        dispatcher: Dispatcher,
        mut shutdown_rx: oneshot::Receiver<()>,
        active_connections: Arc<AtomicUsize>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("TCP server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let current = active_connections.load(Ordering::Relaxed);
                            if current >= ServerConfig::MAX_TCP_CONNECTIONS {
                                warn!(
                                    "Rejecting connection from {}: at max capacity ({})",
                                    peer_addr,
                                    ServerConfig::MAX_TCP_CONNECTIONS
                                );
                                continue;
                            }

                            active_connections.fetch_add(1, Ordering::Relaxed);
                            let dispatcher = dispatcher.clone();
                            let conns = active_connections.clone();

                            tokio::spawn(async move {
                                debug!("Connection from {}", peer_addr);
                                Self::handle_connection(stream, &dispatcher).await;
                                conns.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(mut stream: TcpStream, dispatcher: &Dispatcher) {
        let (mut reader, mut writer) = stream.split();
        dispatcher.process_stream(&mut reader, &mut writer).await;
        if let Err(e) = writer.shutdown().await {
            debug!("Connection shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::envelope::{Context, InvocationRequest};
    use crate::server::{ServiceObject, ServiceRegistry};
    use crate::value::{TypeTag, Value};
    use tokio::io::AsyncReadExt;

    fn dispatcher() -> Dispatcher {
        let mut registry = ServiceRegistry::new();
        registry.register_instance(
            "demo.Math",
            ServiceObject::builder("MathImpl")
                .method("negate", vec![TypeTag::Int], |args| {
                    Ok(Value::Int(-args[0].as_i64().unwrap_or_default()))
                })
                .build(),
        );
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_server_starts() {
        let handle = TcpServer::start(dispatcher(), "127.0.0.1:0").await.unwrap();
        assert!(handle.addr().port() > 0);
        assert!(handle.endpoint().starts_with("tcp://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_one_exchange_per_connection() {
        let handle = TcpServer::start(dispatcher(), "127.0.0.1:0").await.unwrap();

        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
        let frame = codec::encode_request(&InvocationRequest::new(
            "demo.Math",
            "negate",
            vec![Value::Int(5)],
            Context::new(),
        ))
        .unwrap();
        stream.write_all(&frame).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        let response = codec::decode_response(&reply).unwrap();
        assert_eq!(response.result(), Some(&Value::Int(-5)));
    }

    #[tokio::test]
    async fn test_garbage_request_closes_without_reply() {
        let handle = TcpServer::start(dispatcher(), "127.0.0.1:0").await.unwrap();

        let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
        stream.write_all(b"\0\0\0\x04nope").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let mut handle = TcpServer::start(dispatcher(), "127.0.0.1:0").await.unwrap();
        let addr = handle.addr();
        handle.shutdown();
        handle.join().await;

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
