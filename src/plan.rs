//! Plan lookup against the billing service.

use async_trait::async_trait;
use hermes_core::{Error, PlanProvider, Result, SessionLimit};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Billing service response for a tenant's plan.
#[derive(Debug, Deserialize)]
struct PlanResponse {
    /// Concurrent session cap; absent means uncapped
    max_sessions: Option<u32>,
}

/// Plan provider backed by the billing service's HTTP API.
pub struct HttpPlanProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlanProvider {
    /// Create a provider against the billing service base URL.
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::InvalidConfig {
                field: "plan_service_url".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PlanProvider for HttpPlanProvider {
    async fn active_session_limit(&self, company_id: Uuid) -> Result<SessionLimit> {
        let url = format!("{}/api/v1/companies/{company_id}/plan", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GatewayUnreachable(format!("plan service: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::GatewayUnreachable(format!(
                "plan service returned {}",
                response.status()
            )));
        }

        let plan: PlanResponse = response
            .json()
            .await
            .map_err(|e| Error::GatewayUnreachable(format!("plan service: {e}")))?;

        Ok(match plan.max_sessions {
            Some(limit) => SessionLimit::Known(limit),
            None => SessionLimit::Unlimited,
        })
    }
}

/// Fixed limit for deployments without a billing service.
pub struct StaticPlanProvider(pub SessionLimit);

#[async_trait]
impl PlanProvider for StaticPlanProvider {
    async fn active_session_limit(&self, _company_id: Uuid) -> Result<SessionLimit> {
        Ok(self.0)
    }
}
