//! Client-side byte exchange.
//!
//! A [`Transport`] carries one request frame to an endpoint and returns the
//! response frame. It knows nothing about envelopes; the codec runs on both
//! sides of it. Every transport error surfaces as a transport-level
//! [`CarmineError`](crate::CarmineError), never as a remote failure.

mod http;
mod memory;
mod tcp;

pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use crate::config::TransportOptions;
use crate::error::{CarmineError, Result};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Request/response byte exchange with a remote endpoint.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send one request frame and wait for the complete response frame.
    async fn exchange(&self, endpoint: &Url, request: Bytes) -> Result<Bytes>;
}

/// Pick the transport for an endpoint by its URL scheme.
///
/// `http` and `https` go through [`HttpTransport`], `tcp` through
/// [`TcpTransport`].
pub fn for_endpoint(endpoint: &Url, options: &TransportOptions) -> Result<Arc<dyn Transport>> {
    match endpoint.scheme() {
        "http" | "https" => Ok(Arc::new(HttpTransport::new(options.clone())?)),
        "tcp" => Ok(Arc::new(TcpTransport::new(options.clone()))),
        other => Err(CarmineError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_selects_transport() {
        let options = TransportOptions::default();

        let http = for_endpoint(&Url::parse("http://localhost:8080/carmine").unwrap(), &options);
        assert!(format!("{:?}", http.unwrap()).contains("HttpTransport"));

        let tcp = for_endpoint(&Url::parse("tcp://localhost:9000").unwrap(), &options);
        assert!(format!("{:?}", tcp.unwrap()).contains("TcpTransport"));
    }

    #[test]
    fn test_unknown_scheme_is_invalid_endpoint() {
        let result = for_endpoint(
            &Url::parse("ftp://localhost/carmine").unwrap(),
            &TransportOptions::default(),
        );
        assert!(matches!(result, Err(CarmineError::InvalidEndpoint { .. })));
    }
}
