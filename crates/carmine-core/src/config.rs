//! Centralized configuration for Carmine.
//!
//! Wire limits and server defaults are constants; per-session transport
//! behavior is carried by [`TransportOptions`].

use std::time::Duration;

/// Limits of the envelope wire format.
pub struct WireConfig;

impl WireConfig {
    /// Size of the big-endian length prefix in front of every envelope.
    pub const FRAME_HEADER_LEN: usize = 4;
    pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB
    pub const CONTENT_TYPE: &'static str = "application/x-carmine";
}

/// Defaults for the hosting servers.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_INVOKE_PATH: &'static str = "/carmine";
    pub const HEALTH_PATH: &'static str = "/health";
    pub const MAX_TCP_CONNECTIONS: usize = 256;
}

/// Transport behavior for a session.
///
/// The invocation core never imposes a timeout of its own: with the defaults
/// an unresponsive peer keeps the calling task waiting until the transport
/// gives up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Maximum time to establish the connection.
    pub connect_timeout: Option<Duration>,
    /// Maximum time for the whole request/response exchange.
    pub request_timeout: Option<Duration>,
}

impl TransportOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_impose_no_timeout() {
        let options = TransportOptions::default();
        assert!(options.connect_timeout.is_none());
        assert!(options.request_timeout.is_none());
    }

    #[test]
    fn test_limits_are_reasonable() {
        assert!(WireConfig::MAX_MESSAGE_SIZE > 1024);
        assert!(WireConfig::MAX_MESSAGE_SIZE <= u32::MAX as usize);
        assert!(ServerConfig::DEFAULT_INVOKE_PATH.starts_with('/'));
    }
}
