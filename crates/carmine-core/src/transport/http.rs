//! HTTP transport: the request frame is POSTed, the body of the reply is the
//! response frame.

use super::Transport;
use crate::config::{TransportOptions, WireConfig};
use crate::error::{CarmineError, Result};
use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

/// Transport speaking to an HTTP-hosted dispatcher.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    options: TransportOptions,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self> {
        // Connections are not reused between calls.
        let mut builder = Client::builder().pool_max_idle_per_host(0);
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| CarmineError::Config {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self { client, options })
    }

    fn map_error(&self, err: reqwest::Error) -> CarmineError {
        if err.is_timeout() {
            let limit = if err.is_connect() {
                self.options.connect_timeout
            } else {
                self.options.request_timeout
            };
            if let Some(limit) = limit.or(self.options.request_timeout) {
                return CarmineError::Timeout(limit);
            }
        }
        err.into()
    }

    /// Read the reply body, refusing anything larger than one frame.
    async fn read_body(&self, mut response: Response) -> Result<Bytes> {
        let max = WireConfig::FRAME_HEADER_LEN + WireConfig::MAX_MESSAGE_SIZE;
        if let Some(len) = response.content_length() {
            let size = usize::try_from(len).unwrap_or(usize::MAX);
            if size > max {
                return Err(CarmineError::FrameTooLarge { size, max });
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(e))? {
            let size = body.len() + chunk.len();
            if size > max {
                return Err(CarmineError::FrameTooLarge { size, max });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, endpoint: &Url, request: Bytes) -> Result<Bytes> {
        debug!("POST {} ({} bytes)", endpoint, request.len());

        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, WireConfig::CONTENT_TYPE)
            .body(request)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if body.is_empty() {
            return Err(CarmineError::NoResponse {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            return Err(CarmineError::transport(format!(
                "{} answered with HTTP {}",
                endpoint, status
            )));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(
            TransportOptions::default().with_connect_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let endpoint = Url::parse(&format!("http://{}/carmine", addr)).unwrap();

        let err = transport
            .exchange(&endpoint, Bytes::from_static(b"\0\0\0\0"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_empty_reply_is_no_response() {
        let app = axum::Router::new().route(
            "/carmine",
            axum::routing::post(|| async { axum::http::StatusCode::BAD_REQUEST }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let transport = HttpTransport::new(TransportOptions::default()).unwrap();
        let endpoint = Url::parse(&format!("http://{}/carmine", addr)).unwrap();
        let err = transport
            .exchange(&endpoint, Bytes::from_static(b"\0\0\0\0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CarmineError::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_oversized_reply_is_rejected() {
        let app = axum::Router::new().route(
            "/carmine",
            axum::routing::post(|| async {
                vec![0u8; WireConfig::FRAME_HEADER_LEN + WireConfig::MAX_MESSAGE_SIZE + 1]
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let transport = HttpTransport::new(TransportOptions::default()).unwrap();
        let endpoint = Url::parse(&format!("http://{}/carmine", addr)).unwrap();
        let err = transport
            .exchange(&endpoint, Bytes::from_static(b"\0\0\0\0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CarmineError::FrameTooLarge { .. }));
        assert!(err.is_transport());
    }
}
