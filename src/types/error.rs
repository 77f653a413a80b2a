//! Error types for the content engine
//!
//! Errors never cross the resolver boundary. They are produced by the fetch
//! layer, broadcast to every joined waiter, and then folded into a bundle's
//! `error` message. Collections report id exhaustion through the same type.

use std::time::Duration;

/// Main error type for content and dropdown fetches
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch cancelled before it settled")]
    Cancelled,

    #[error("No id left above {}", u32::MAX)]
    IdExhausted,
}

impl ContentError {
    /// JSON parse failures and unexpected payload shapes.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }

    /// Failures of the transport itself (unreachable, timed out, non-2xx, non-success status).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Http { .. } | Self::Api(_)
        )
    }

    /// Short tag used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::Api(_) => "api",
            Self::MalformedResponse(_) => "malformed",
            Self::Config(_) => "config",
            Self::Cancelled => "cancelled",
            Self::IdExhausted => "id_exhausted",
        }
    }
}

/// Timeouts are mapped by the client, which knows the configured duration.
impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ContentError>;
