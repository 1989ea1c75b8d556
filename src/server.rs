//! Server module for Hermes
//!
//! Wires the session engine to the HTTP surface and runs the axum server.

use anyhow::{Context, Result};
use axum::{Extension, Router};
use hermes_core::{
    CapacityGuard, CoreConfig, DefaultEnforcer, EventIngress, LifecycleController, PlanProvider,
    SessionLimit, SessionStore, SqliteMessageLog, StatsAggregator, TenantEventBus,
    TransferCoordinator,
};
use hermes_gateway::{GatewayConfig, HttpGatewayClient};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::api::auth::AuthSettings;
use crate::plan::{HttpPlanProvider, StaticPlanProvider};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Key granting cross-tenant admin privilege
    pub admin_key: Option<String>,
    /// Billing service base URL; absent means no session caps
    pub plan_service_url: Option<String>,
    pub core: CoreConfig,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HERMES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("HERMES_PORT")
                .ok()
                .map(|p| p.parse::<u16>())
                .transpose()
                .context("HERMES_PORT is not a valid port")?
                .unwrap_or(8080),
            admin_key: std::env::var("HERMES_ADMIN_KEY").ok(),
            plan_service_url: std::env::var("HERMES_PLAN_SERVICE_URL").ok(),
            core: CoreConfig::from_env()?,
            gateway: GatewayConfig::from_env(),
        })
    }
}

/// Shared application state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub controller: Arc<LifecycleController>,
    pub enforcer: Arc<DefaultEnforcer>,
    pub transfer: Arc<TransferCoordinator>,
    pub stats: Arc<StatsAggregator>,
    pub ingress: Arc<EventIngress>,
    pub bus: Arc<TenantEventBus>,
}

impl AppState {
    /// Build the full engine from configuration.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(
            SessionStore::from_path(Path::new(&config.core.database_path))
                .await
                .context("failed to open session store")?,
        );
        let bus = Arc::new(TenantEventBus::new(config.core.event_capacity));
        let gateway = Arc::new(
            HttpGatewayClient::new(config.gateway.clone())
                .context("failed to build gateway client")?,
        );

        let plans: Arc<dyn PlanProvider> = match &config.plan_service_url {
            Some(url) => {
                info!(url = %url, "plan lookups via billing service");
                Arc::new(HttpPlanProvider::new(url.clone())?)
            }
            None => {
                info!("no billing service configured, sessions uncapped");
                Arc::new(StaticPlanProvider(SessionLimit::Unlimited))
            }
        };

        let controller = Arc::new(LifecycleController::new(
            store.clone(),
            gateway.clone(),
            CapacityGuard::new(plans.clone()),
            bus.clone(),
        ));
        let enforcer = Arc::new(DefaultEnforcer::new(store.clone(), bus.clone()));
        let transfer = Arc::new(TransferCoordinator::new(
            store.clone(),
            CapacityGuard::new(plans),
        ));
        let log = Arc::new(
            SqliteMessageLog::new(store.pool().clone())
                .await
                .context("failed to open message log")?,
        );
        let stats = Arc::new(StatsAggregator::new(store.clone(), log, gateway));
        let ingress = Arc::new(EventIngress::new(store.clone(), bus.clone()));

        Ok(Self {
            store,
            controller,
            enforcer,
            transfer,
            stats,
            ingress,
            bus,
        })
    }
}

/// Build the router with middleware applied.
pub fn build_router(state: AppState, auth: AuthSettings) -> Router {
    api::api_router(state)
        .layer(Extension(Arc::new(auth)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server until shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let state = AppState::build(&config).await?;
    let app = build_router(
        state,
        AuthSettings {
            admin_key: config.admin_key.clone(),
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid server address")?;
    info!(%addr, "hermes listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind server address")?;
    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
