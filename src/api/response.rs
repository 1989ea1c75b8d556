//! Shared API response envelope and error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hermes_core::error::UserFriendlyError;
use serde::Serialize;
use tracing::error;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Core errors rendered as JSON responses. The body carries the short
/// user-facing message; the detailed cause goes to the log.
pub struct ApiError(pub hermes_core::Error);

impl From<hermes_core::Error> for ApiError {
    fn from(err: hermes_core::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use hermes_core::Error;

        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::QuotaExceeded { .. }
            | Error::OperationInFlight(_)
            | Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::GatewayUnreachable(_) | Error::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            Error::InvariantViolation(_)
            | Error::InvalidConfig { .. }
            | Error::Database(_)
            | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "internal error serving request");
        }

        (
            status,
            Json(ApiResponse::<()>::error(self.0.user_message())),
        )
            .into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a successful payload.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
