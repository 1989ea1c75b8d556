//! Error types for hermes-gateway

use thiserror::Error;

/// Gateway client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Network/connection error (transient — safe to retry once)
    #[error("network error: {0}")]
    Network(String),

    /// The bridge rejected the request (4xx-class, permanent)
    #[error("gateway rejected request: {0}")]
    Rejected(String),

    /// The bridge answered with a body we could not decode
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether the failure is transient and worth a single automatic retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(Error::Network("connection refused".to_string()).is_transient());
        assert!(!Error::Rejected("unknown session".to_string()).is_transient());
        assert!(!Error::InvalidResponse("not json".to_string()).is_transient());
    }
}
