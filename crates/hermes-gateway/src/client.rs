//! HTTP client for the messaging bridge REST API.

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::types::{AckResponse, ProfileInfo, ProfileResponse, QrResponse};

use async_trait::async_trait;
use tracing::{debug, info};

/// Lifecycle and profile operations against the external messaging gateway.
///
/// Every lifecycle call is acknowledgment-only: a `Ok(())` means the bridge
/// accepted the request, not that the target state has been reached. Callers
/// observe the actual transition later via reload or pushed event.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Request connection start for a channel.
    async fn start(&self, session_name: &str) -> Result<()>;

    /// Request connection pause for a channel.
    async fn stop(&self, session_name: &str) -> Result<()>;

    /// Request a restart (generic unstick operation).
    async fn restart(&self, session_name: &str) -> Result<()>;

    /// Revoke the device pairing. Reconnecting requires a fresh QR scan.
    async fn logout(&self, session_name: &str) -> Result<()>;

    /// Request permanent teardown of the channel.
    async fn delete(&self, session_name: &str) -> Result<()>;

    /// Fetch the account profile (picture, display name).
    async fn get_profile(&self, session_name: &str) -> Result<ProfileInfo>;

    /// Fetch the current QR pairing code, if the channel is waiting for a scan.
    async fn get_qr(&self, session_name: &str) -> Result<Option<String>>;
}

/// Bridge REST API client
pub struct HttpGatewayClient {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-Api-Key", key);
        }
        builder
    }

    /// Issue a lifecycle request and interpret the acknowledgment.
    async fn lifecycle(&self, method: reqwest::Method, path: String) -> Result<()> {
        let url = format!("{}{}", self.config.bridge_url, path);
        debug!(%url, "gateway lifecycle request");

        let resp = self
            .request(method, url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to reach bridge: {e}")))?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected(format!("{status}: {body}")));
        }
        // 5xx means the bridge itself is unhealthy, treated as transient.
        if status.is_server_error() {
            return Err(Error::Network(format!("bridge error: {status}")));
        }

        let ack: AckResponse = resp
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("bad acknowledgment: {e}")))?;

        if ack.success {
            Ok(())
        } else {
            Err(Error::Rejected(
                ack.error.unwrap_or_else(|| "request not accepted".to_string()),
            ))
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn start(&self, session_name: &str) -> Result<()> {
        self.lifecycle(
            reqwest::Method::POST,
            format!("/api/sessions/{session_name}/start"),
        )
        .await?;
        info!(session = %session_name, "gateway start accepted");
        Ok(())
    }

    async fn stop(&self, session_name: &str) -> Result<()> {
        self.lifecycle(
            reqwest::Method::POST,
            format!("/api/sessions/{session_name}/stop"),
        )
        .await
    }

    async fn restart(&self, session_name: &str) -> Result<()> {
        self.lifecycle(
            reqwest::Method::POST,
            format!("/api/sessions/{session_name}/restart"),
        )
        .await
    }

    async fn logout(&self, session_name: &str) -> Result<()> {
        self.lifecycle(
            reqwest::Method::POST,
            format!("/api/sessions/{session_name}/logout"),
        )
        .await
    }

    async fn delete(&self, session_name: &str) -> Result<()> {
        self.lifecycle(
            reqwest::Method::DELETE,
            format!("/api/sessions/{session_name}"),
        )
        .await
    }

    async fn get_profile(&self, session_name: &str) -> Result<ProfileInfo> {
        let url = format!(
            "{}/api/sessions/{session_name}/profile",
            self.config.bridge_url
        );

        let resp: ProfileResponse = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to fetch profile: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Rejected(format!("profile lookup failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("bad profile response: {e}")))?;

        Ok(resp.into())
    }

    async fn get_qr(&self, session_name: &str) -> Result<Option<String>> {
        let url = format!("{}/api/sessions/{session_name}/qr", self.config.bridge_url);

        let resp: QrResponse = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to fetch QR code: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Rejected(format!("QR lookup failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("bad QR response: {e}")))?;

        Ok(resp.qr)
    }
}
