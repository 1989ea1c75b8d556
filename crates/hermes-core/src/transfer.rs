//! Ownership transfer between tenants.
//!
//! Admin-only: moves a session to another tenant while preserving its
//! identity — the gateway channel, pairing, phone binding, and status all
//! carry over. The default flag does not: the target tenant keeps its own
//! default, so a transferred default arrives with the flag cleared.

use crate::auth::Requester;
use crate::capacity::CapacityGuard;
use crate::error::Result;
use crate::session::{Session, SessionStatus};
use crate::store::SessionStore;

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Moves sessions between tenants.
pub struct TransferCoordinator {
    store: Arc<SessionStore>,
    guard: CapacityGuard,
}

impl TransferCoordinator {
    /// Create a new coordinator.
    pub fn new(store: Arc<SessionStore>, guard: CapacityGuard) -> Self {
        Self { store, guard }
    }

    /// Transfer `session_id` to `target_company`.
    ///
    /// A WORKING session counts against the receiving tenant's quota the
    /// moment it lands, so the target's capacity is checked first. Sessions
    /// in any other state transfer unconditionally — they only consume quota
    /// when started.
    pub async fn transfer(
        &self,
        requester: &Requester,
        session_id: Uuid,
        target_company: Uuid,
    ) -> Result<Session> {
        requester.require_admin()?;
        let session = self.store.get(session_id).await?;

        if session.status == SessionStatus::Working {
            self.guard.check(&self.store, target_company).await?;
        }

        self.store.set_company(session_id, target_company).await?;
        if session.is_default {
            // The single-default invariant is per tenant; arriving as default
            // could collide with the target's existing default.
            self.store.set_default_flag(session_id, false).await?;
        }
        info!(
            session = %session_id,
            from = %session.company_id,
            to = %target_company,
            "session transferred"
        );

        self.store.get(session_id).await
    }
}
