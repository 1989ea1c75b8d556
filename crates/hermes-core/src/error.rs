//! Error types for hermes-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tenant is at its plan-derived session capacity
    #[error("session quota exceeded (limit {limit})")]
    QuotaExceeded {
        /// The plan-derived limit that was hit
        limit: u32,
    },

    /// Gateway could not be reached (transient, already retried once)
    #[error("gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// Gateway rejected the request (permanent)
    #[error("gateway rejected: {0}")]
    GatewayRejected(String),

    /// Single-default invariant repair failed to converge
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Session id unknown or already soft-deleted
    #[error("not found: {0}")]
    NotFound(String),

    /// Another command is outstanding for the same session
    #[error("operation already in flight for session {0}")]
    OperationInFlight(uuid::Uuid),

    /// Command precondition failed (e.g. start on a WORKING session)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Requester does not own the session and is not admin
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid configuration
    #[error("invalid configuration: {field}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a gateway client error into the core taxonomy.
    ///
    /// Transient network failures become `GatewayUnreachable`; everything else
    /// (4xx-class rejections, undecodable responses) is `GatewayRejected`.
    pub fn from_gateway(err: hermes_gateway::Error) -> Self {
        if err.is_transient() {
            Error::GatewayUnreachable(err.to_string())
        } else {
            Error::GatewayRejected(err.to_string())
        }
    }
}

/// Trait for user-friendly error messages
///
/// Maps detailed causes to the short human-readable strings surfaced by the
/// API layer.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::QuotaExceeded { .. } => {
                "Quota reached. Stop another session to free a slot.".to_string()
            }
            Error::GatewayUnreachable(_) => {
                "Could not reach the messaging service, try again.".to_string()
            }
            Error::GatewayRejected(_) => {
                "The messaging service rejected the request.".to_string()
            }
            Error::NotFound(_) => "Session not found.".to_string(),
            Error::OperationInFlight(_) => {
                "Another operation is still running for this session.".to_string()
            }
            Error::InvalidState(msg) => msg.clone(),
            Error::Unauthorized(_) => "You do not have access to this session.".to_string(),
            Error::InvariantViolation(_)
            | Error::InvalidConfig { .. }
            | Error::Database(_)
            | Error::Serialization(_) => "Internal error, try again later.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_is_short_and_actionable() {
        let error = Error::QuotaExceeded { limit: 2 };
        let msg = error.user_message();
        assert!(msg.contains("Quota"));
        // Detailed limit stays in the Display impl, not the user message
        assert!(error.to_string().contains('2'));
    }

    #[test]
    fn test_transient_gateway_error_maps_to_unreachable() {
        let err = Error::from_gateway(hermes_gateway::Error::Network("timeout".to_string()));
        assert!(matches!(err, Error::GatewayUnreachable(_)));
    }

    #[test]
    fn test_rejection_maps_to_rejected() {
        let err =
            Error::from_gateway(hermes_gateway::Error::Rejected("bad session name".to_string()));
        assert!(matches!(err, Error::GatewayRejected(_)));
    }

    #[test]
    fn test_internal_errors_are_not_detailed_to_users() {
        let error = Error::InvariantViolation("two defaults for tenant x".to_string());
        assert!(!error.user_message().contains("defaults"));
    }
}
