//! Error types for Carmine.
//!
//! Two families of failure reach a caller: transport-level errors (the byte
//! exchange could not be completed or produced nothing decodable) and remote
//! application failures, which crossed the boundary as data and are
//! re-raised locally as [`CarmineError::Remote`].

use crate::envelope::RemoteFailure;
use thiserror::Error;

/// Main error type for Carmine.
#[derive(Debug, Error)]
pub enum CarmineError {
    // Transport errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No response received from {endpoint}")]
    NoResponse { endpoint: String },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Envelope errors
    #[error("Failed to decode envelope: {message}")]
    Decode { message: String },

    #[error("Failed to encode envelope: {message}")]
    Encode { message: String },

    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    // Value conversion errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    // Configuration errors
    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // Failure raised on the remote side
    #[error(transparent)]
    Remote(#[from] RemoteFailure),
}

/// Result type alias for Carmine operations.
pub type Result<T> = std::result::Result<T, CarmineError>;

impl From<std::io::Error> for CarmineError {
    fn from(err: std::io::Error) -> Self {
        CarmineError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CarmineError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            CarmineError::Decode {
                message: err.to_string(),
            }
        } else {
            CarmineError::Encode {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for CarmineError {
    fn from(err: reqwest::Error) -> Self {
        CarmineError::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl CarmineError {
    /// Create a transport error without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        CarmineError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a type mismatch error for a value conversion.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CarmineError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// True when the byte exchange itself failed and no remote outcome is known.
    ///
    /// A caller's context is never modified by a call that ends in one of these.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CarmineError::Transport { .. }
                | CarmineError::NoResponse { .. }
                | CarmineError::Timeout(_)
                | CarmineError::Io { .. }
                | CarmineError::Decode { .. }
                | CarmineError::FrameTooLarge { .. }
        )
    }

    /// The remote failure carried by this error, if it came from the peer.
    pub fn remote_failure(&self) -> Option<&RemoteFailure> {
        match self {
            CarmineError::Remote(failure) => Some(failure),
            _ => None,
        }
    }

    /// Convert into a failure descriptor suitable for sending to a caller.
    ///
    /// Remote failures pass through untouched; local errors are described by
    /// their variant so the kind survives the trip.
    pub fn into_failure(self) -> RemoteFailure {
        let kind = match &self {
            CarmineError::Transport { .. } => "TransportError",
            CarmineError::NoResponse { .. } => "NoResponse",
            CarmineError::Timeout(_) => "Timeout",
            CarmineError::Io { .. } => "IoError",
            CarmineError::Decode { .. } => "DecodeError",
            CarmineError::Encode { .. } => "EncodeError",
            CarmineError::FrameTooLarge { .. } => "FrameTooLarge",
            CarmineError::TypeMismatch { .. } => "TypeMismatch",
            CarmineError::InvalidEndpoint { .. } => "InvalidEndpoint",
            CarmineError::Config { .. } => "ConfigError",
            CarmineError::Remote(_) => "RemoteFailure",
        };
        match self {
            CarmineError::Remote(failure) => failure,
            other => RemoteFailure::new(kind, other.to_string()),
        }
    }
}
