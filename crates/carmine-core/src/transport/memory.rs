//! In-process transport handing frames straight to a [`Dispatcher`].

use super::Transport;
use crate::error::{CarmineError, Result};
use crate::server::Dispatcher;
use bytes::Bytes;
use url::Url;

/// Transport that never leaves the process. Frames are still fully encoded
/// and decoded, so behavior matches the network transports.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    dispatcher: Dispatcher,
}

impl MemoryTransport {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn exchange(&self, endpoint: &Url, request: Bytes) -> Result<Bytes> {
        self.dispatcher
            .process_request(&request)
            .await
            .map(Bytes::from)
            .ok_or_else(|| CarmineError::NoResponse {
                endpoint: endpoint.to_string(),
            })
    }
}
