//! hermes-core — session lifecycle engine for the Hermes CRM.
//!
//! Owns the mapping between a tenant (company) and its connections to the
//! external messaging gateway. One connection = one session, a phone-bound
//! channel. The authoritative session status lives in the gateway; user
//! commands and gateway-pushed events are two independent writers over the
//! same store, reconciled by full-record reloads rather than delta merging.

pub mod auth;
pub mod capacity;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod ingress;
pub mod lifecycle;
pub mod session;
pub mod stats;
pub mod store;
pub mod transfer;

pub use auth::Requester;
pub use capacity::{CapacityGuard, PlanProvider, SessionLimit};
pub use config::CoreConfig;
pub use defaults::DefaultEnforcer;
pub use error::{Error, Result};
pub use events::{SessionEvent, TenantEventBus};
pub use ingress::{EventIngress, GatewayEvent};
pub use lifecycle::LifecycleController;
pub use session::{Session, SessionStatus};
pub use stats::{
    Direction, MessageLog, MessageRecord, SessionStats, SqliteMessageLog, StatsAggregator,
};
pub use store::SessionStore;
pub use transfer::TransferCoordinator;
