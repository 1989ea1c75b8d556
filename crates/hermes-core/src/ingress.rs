//! Event ingress: gateway-pushed session events.
//!
//! The second, independent writer over the session store. The real-time
//! transport delivers tagged events filtered to a single tenant; recognized
//! types mutate the store restricted to the legal status edge set, or trigger
//! a full reload of the tenant's collection. Reprocessing the same event is a
//! no-op beyond redundant reads — ordering is not guaranteed by the
//! transport.

use crate::error::Result;
use crate::events::{SessionEvent, TenantEventBus};
use crate::session::SessionStatus;
use crate::store::SessionStore;

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Event kind for a gateway-reported status change.
pub const EVENT_SESSION_STATUS: &str = "session.status";
/// Event kind signalling that a tenant's collection should be reloaded.
pub const EVENT_SESSION_UPDATED: &str = "session_updated";

/// A tagged event from the tenant's real-time stream.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    /// Event type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Tenant the event stream is filtered to
    pub company_id: Uuid,
    /// Gateway channel the event concerns (status events)
    #[serde(default)]
    pub session_name: Option<String>,
    /// Reported status (status events)
    #[serde(default)]
    pub status: Option<SessionStatus>,
    /// Bound phone number, reported once connected
    #[serde(default)]
    pub phone: Option<String>,
    /// Display name the paired account advertises
    #[serde(default)]
    pub push_name: Option<String>,
}

/// Translates pushed gateway events into session store mutations.
pub struct EventIngress {
    store: Arc<SessionStore>,
    bus: Arc<TenantEventBus>,
}

impl EventIngress {
    /// Create a new ingress over the shared store and bus.
    pub fn new(store: Arc<SessionStore>, bus: Arc<TenantEventBus>) -> Self {
        Self { store, bus }
    }

    /// Process one pushed event. Unrecognized types are ignored.
    pub async fn handle(&self, event: GatewayEvent) -> Result<()> {
        match event.kind.as_str() {
            EVENT_SESSION_STATUS => self.apply_status(event).await,
            EVENT_SESSION_UPDATED => self.reload(event.company_id).await,
            other => {
                debug!(kind = %other, "ignoring unrecognized gateway event");
                Ok(())
            }
        }
    }

    /// Apply a reported status change, restricted to the legal edge set.
    async fn apply_status(&self, event: GatewayEvent) -> Result<()> {
        let (Some(name), Some(reported)) = (event.session_name.as_deref(), event.status) else {
            warn!(company = %event.company_id, "status event missing session name or status");
            return Ok(());
        };

        let Some(session) = self.store.get_by_name(event.company_id, name).await? else {
            warn!(company = %event.company_id, session = %name, "status event for unknown session");
            return Ok(());
        };

        if session.status == reported {
            // Replay of a state we already hold
            return Ok(());
        }
        if !session.status.can_transition(reported) {
            warn!(
                session = %session.id,
                from = %session.status,
                to = %reported,
                "ignoring status event outside the edge set"
            );
            return Ok(());
        }

        if reported == SessionStatus::Working {
            // First WORKING binds the phone; later transitions never clear it
            self.store
                .record_working(session.id, event.phone.as_deref(), event.push_name.as_deref())
                .await?;
        } else {
            self.store.update_status(session.id, reported).await?;
        }

        info!(session = %session.id, from = %session.status, to = %reported, "gateway status applied");
        self.bus.publish(
            event.company_id,
            SessionEvent::SessionUpdated {
                session_id: session.id,
                status: reported,
            },
        );
        Ok(())
    }

    /// Full reload of the tenant's collection. Reconciling partial events
    /// against an unknown prior state is strictly harder, and the reload cost
    /// is small at this entity count.
    async fn reload(&self, company_id: Uuid) -> Result<()> {
        let sessions = self.store.list_by_company(company_id).await?;
        self.bus.publish(
            company_id,
            SessionEvent::SessionsReloaded {
                count: sessions.len(),
            },
        );
        Ok(())
    }
}
