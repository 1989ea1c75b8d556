//! Request authentication for the session API.
//!
//! Upstream CRM middleware terminates user auth; this service trusts the
//! tenant it forwards in `X-Company-Id` and grants admin privilege only when
//! `X-Admin-Key` matches the configured key. Provides the `RequireAuth`
//! extractor for handlers.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use hermes_core::Requester;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Auth configuration shared through request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Key granting cross-tenant admin privilege. `None` disables admin.
    pub admin_key: Option<String>,
}

/// JSON error response for auth failures
#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    success: bool,
    error: String,
    code: String,
}

/// Auth rejection type
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    error: String,
    code: &'static str,
}

impl AuthRejection {
    fn unauthorized(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: error.into(),
            code,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(AuthErrorResponse {
                success: false,
                error: self.error,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}

/// Axum extractor resolving the acting tenant.
pub struct RequireAuth(pub Requester);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let settings = parts
            .extensions
            .get::<Arc<AuthSettings>>()
            .cloned()
            .unwrap_or_default();

        let company_id = parts
            .headers
            .get("x-company-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AuthRejection::unauthorized("Missing X-Company-Id header", "MISSING_COMPANY")
            })?;
        let company_id = Uuid::parse_str(company_id).map_err(|_| {
            AuthRejection::unauthorized("Invalid X-Company-Id header", "INVALID_COMPANY")
        })?;

        let admin_header = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok());
        let requester = match (admin_header, settings.admin_key.as_deref()) {
            (Some(provided), Some(expected)) if provided == expected => {
                Requester::admin(company_id)
            }
            (Some(_), _) => {
                return Err(AuthRejection::unauthorized(
                    "Invalid admin key",
                    "INVALID_ADMIN_KEY",
                ));
            }
            (None, _) => Requester::company(company_id),
        };

        Ok(RequireAuth(requester))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(
        request: Request<()>,
        settings: Option<AuthSettings>,
    ) -> std::result::Result<Requester, AuthRejection> {
        let (mut parts, ()) = request.into_parts();
        if let Some(settings) = settings {
            parts.extensions.insert(Arc::new(settings));
        }
        RequireAuth::from_request_parts(&mut parts, &())
            .await
            .map(|RequireAuth(requester)| requester)
    }

    #[tokio::test]
    async fn test_company_header_scopes_the_request() {
        let company = Uuid::new_v4();
        let request = Request::builder()
            .header("x-company-id", company.to_string())
            .body(())
            .unwrap();

        let requester = extract(request, None).await.unwrap();
        assert_eq!(requester.company_id, company);
        assert!(!requester.admin);
    }

    #[tokio::test]
    async fn test_missing_company_is_rejected() {
        let request = Request::builder().body(()).unwrap();
        let rejection = extract(request, None).await.unwrap_err();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_matching_admin_key_grants_admin() {
        let request = Request::builder()
            .header("x-company-id", Uuid::new_v4().to_string())
            .header("x-admin-key", "s3cret")
            .body(())
            .unwrap();

        let settings = AuthSettings {
            admin_key: Some("s3cret".to_string()),
        };
        let requester = extract(request, Some(settings)).await.unwrap();
        assert!(requester.admin);
    }

    #[tokio::test]
    async fn test_wrong_admin_key_is_rejected_not_downgraded() {
        let request = Request::builder()
            .header("x-company-id", Uuid::new_v4().to_string())
            .header("x-admin-key", "wrong")
            .body(())
            .unwrap();

        let settings = AuthSettings {
            admin_key: Some("s3cret".to_string()),
        };
        assert!(extract(request, Some(settings)).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_key_without_configuration_is_rejected() {
        let request = Request::builder()
            .header("x-company-id", Uuid::new_v4().to_string())
            .header("x-admin-key", "anything")
            .body(())
            .unwrap();

        assert!(extract(request, None).await.is_err());
    }
}
