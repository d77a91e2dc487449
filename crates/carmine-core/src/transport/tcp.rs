//! Raw TCP transport, `tcp://host:port` endpoints.
//!
//! A fresh connection per call: write the request frame, half-close, read
//! until the server closes.

use super::Transport;
use crate::config::{TransportOptions, WireConfig};
use crate::error::{CarmineError, Result};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Url};

/// Transport speaking to a [`TcpServer`](crate::server::TcpServer).
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    options: TransportOptions,
}

impl TcpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    async fn round_trip(&self, endpoint: &Url, request: Bytes) -> Result<Bytes> {
        let (host, port) = target(endpoint)?;

        let connect = TcpStream::connect((host.as_str(), port));
        let connected = match self.options.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| CarmineError::Timeout(limit))?,
            None => connect.await,
        };
        let mut stream = connected.map_err(|e| CarmineError::Transport {
            message: format!("Failed to connect to {}: {}", endpoint, e),
            source: Some(Box::new(e)),
        })?;

        debug!("Connected to {} ({} bytes to send)", endpoint, request.len());

        stream.write_all(&request).await?;
        stream.shutdown().await?;

        let limit = (WireConfig::FRAME_HEADER_LEN + WireConfig::MAX_MESSAGE_SIZE) as u64;
        let mut response = Vec::new();
        (&mut stream).take(limit).read_to_end(&mut response).await?;

        if response.is_empty() {
            return Err(CarmineError::NoResponse {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(Bytes::from(response))
    }
}

fn target(endpoint: &Url) -> Result<(String, u16)> {
    let invalid = |message: &str| CarmineError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: message.to_string(),
    };

    let host = match endpoint.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(invalid("missing host")),
    };
    let port = endpoint.port().ok_or_else(|| invalid("missing port"))?;
    Ok((host, port))
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn exchange(&self, endpoint: &Url, request: Bytes) -> Result<Bytes> {
        match self.options.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(endpoint, request))
                .await
                .map_err(|_| CarmineError::Timeout(limit))?,
            None => self.round_trip(endpoint, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn test_target_requires_port() {
        let endpoint = Url::parse("tcp://localhost").unwrap();
        assert!(matches!(
            target(&endpoint),
            Err(CarmineError::InvalidEndpoint { .. })
        ));

        let endpoint = Url::parse("tcp://[::1]:9000").unwrap();
        assert_eq!(target(&endpoint).unwrap(), ("::1".to_string(), 9000));
    }

    #[tokio::test]
    async fn test_closed_without_reply_is_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        });

        let endpoint = Url::parse(&format!("tcp://{}", addr)).unwrap();
        let err = TcpTransport::default()
            .exchange(&endpoint, Bytes::from_static(b"\0\0\0\0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CarmineError::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let transport = TcpTransport::new(
            TransportOptions::default().with_request_timeout(Duration::from_millis(100)),
        );
        let endpoint = Url::parse(&format!("tcp://{}", addr)).unwrap();
        let err = transport
            .exchange(&endpoint, Bytes::from_static(b"\0\0\0\0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CarmineError::Timeout(_)));
        assert!(err.is_transport());
    }
}
