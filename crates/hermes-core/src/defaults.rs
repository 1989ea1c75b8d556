//! Default and system-session flag maintenance.
//!
//! `is_default` is set-exclusive across a tenant's non-deleted sessions, but
//! the store only exposes per-record updates, so switching the default is a
//! saga: write the target, then clear every other record, then verify. A
//! partial failure after the target write can transiently leave two defaults;
//! the repair pass re-runs the clear rather than leaving the ambiguity.

use crate::auth::Requester;
use crate::error::{Error, Result};
use crate::events::{SessionEvent, TenantEventBus};
use crate::store::SessionStore;

use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Bounded repair attempts for the clear pass.
const REPAIR_ATTEMPTS: u32 = 3;

/// Maintains the single-default and system-session flags.
pub struct DefaultEnforcer {
    store: Arc<SessionStore>,
    bus: Arc<TenantEventBus>,
}

impl DefaultEnforcer {
    /// Create a new enforcer.
    pub fn new(store: Arc<SessionStore>, bus: Arc<TenantEventBus>) -> Self {
        Self { store, bus }
    }

    /// Make `session_id` the tenant's single default session.
    ///
    /// The user-visible switch (the target's flag) happens first; clearing
    /// the other records is verified and repaired best-effort. A repair that
    /// cannot converge is logged at error severity but does not fail the
    /// operation — the requested default is already in place.
    pub async fn set_default(&self, requester: &Requester, session_id: Uuid) -> Result<()> {
        let session = self.store.get(session_id).await?;
        requester.check_ownership(&session)?;

        self.store.set_default_flag(session_id, true).await?;

        if let Err(e) = self.clear_and_verify(session.company_id, session_id).await {
            error!(
                company = %session.company_id,
                session = %session_id,
                error = %e,
                "single-default repair did not converge"
            );
        }

        self.bus.publish(
            session.company_id,
            SessionEvent::SessionUpdated {
                session_id,
                status: session.status,
            },
        );
        Ok(())
    }

    /// Clear the default flag on the target. No compensating set elsewhere.
    pub async fn unset_default(&self, requester: &Requester, session_id: Uuid) -> Result<()> {
        let session = self.store.get(session_id).await?;
        requester.check_ownership(&session)?;

        self.store.set_default_flag(session_id, false).await?;
        self.bus.publish(
            session.company_id,
            SessionEvent::SessionUpdated {
                session_id,
                status: session.status,
            },
        );
        Ok(())
    }

    /// Flip the system-session marker. Admin-only; multiple system sessions
    /// per tenant are permitted.
    pub async fn toggle_system_session(
        &self,
        requester: &Requester,
        session_id: Uuid,
    ) -> Result<bool> {
        requester.require_admin()?;
        let session = self.store.get(session_id).await?;

        let flipped = !session.is_system_session;
        self.store.set_system_flag(session_id, flipped).await?;
        self.bus.publish(
            session.company_id,
            SessionEvent::SessionUpdated {
                session_id,
                status: session.status,
            },
        );
        Ok(flipped)
    }

    /// Clear pass plus verification, retried up to `REPAIR_ATTEMPTS`.
    async fn clear_and_verify(&self, company_id: Uuid, keep: Uuid) -> Result<()> {
        for attempt in 1..=REPAIR_ATTEMPTS {
            match self.clear_others(company_id, keep).await {
                Ok(()) => {
                    // Verify: re-read and count. A concurrent ingress reload
                    // may have interleaved; only a converged state ends here.
                    let defaults = self.count_defaults(company_id).await?;
                    if defaults <= 1 {
                        return Ok(());
                    }
                    warn!(
                        company = %company_id,
                        defaults,
                        attempt,
                        "duplicate defaults after clear pass, repairing"
                    );
                }
                Err(e) => {
                    warn!(company = %company_id, attempt, error = %e, "default clear pass failed");
                }
            }
        }
        Err(Error::InvariantViolation(format!(
            "more than one default session for tenant {company_id}"
        )))
    }

    async fn clear_others(&self, company_id: Uuid, keep: Uuid) -> Result<()> {
        let sessions = self.store.list_by_company(company_id).await?;
        for other in sessions.iter().filter(|s| s.is_default && s.id != keep) {
            // NotFound here means an ingress writer deleted it concurrently;
            // that record can no longer hold a duplicate default.
            match self.store.set_default_flag(other.id, false).await {
                Ok(()) | Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn count_defaults(&self, company_id: Uuid) -> Result<usize> {
        let sessions = self.store.list_by_company(company_id).await?;
        Ok(sessions.iter().filter(|s| s.is_default).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    async fn setup() -> (Arc<SessionStore>, DefaultEnforcer, Uuid, Vec<Session>) {
        let store = Arc::new(SessionStore::in_memory().await.unwrap());
        let bus = Arc::new(TenantEventBus::default());
        let enforcer = DefaultEnforcer::new(store.clone(), bus);

        let company = Uuid::new_v4();
        let mut sessions = Vec::new();
        for name in ["a", "b", "c"] {
            let s = Session::new(company, name.to_string(), None);
            store.insert(&s).await.unwrap();
            sessions.push(s);
        }
        (store, enforcer, company, sessions)
    }

    async fn default_ids(store: &SessionStore, company: Uuid) -> Vec<Uuid> {
        store
            .list_by_company(company)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.is_default)
            .map(|s| s.id)
            .collect()
    }

    #[tokio::test]
    async fn test_set_default_is_exclusive() {
        let (store, enforcer, company, sessions) = setup().await;
        let requester = Requester::company(company);

        enforcer.set_default(&requester, sessions[0].id).await.unwrap();
        assert_eq!(default_ids(&store, company).await, vec![sessions[0].id]);

        // Switching moves the single flag
        enforcer.set_default(&requester, sessions[1].id).await.unwrap();
        assert_eq!(default_ids(&store, company).await, vec![sessions[1].id]);
    }

    #[tokio::test]
    async fn test_set_default_repairs_preexisting_duplicates() {
        let (store, enforcer, company, sessions) = setup().await;

        // Simulate the interleaved-writer hazard: two defaults already set
        store.set_default_flag(sessions[0].id, true).await.unwrap();
        store.set_default_flag(sessions[1].id, true).await.unwrap();

        let requester = Requester::company(company);
        enforcer.set_default(&requester, sessions[2].id).await.unwrap();

        assert_eq!(default_ids(&store, company).await, vec![sessions[2].id]);
    }

    #[tokio::test]
    async fn test_unset_default_has_no_compensating_set() {
        let (store, enforcer, company, sessions) = setup().await;
        let requester = Requester::company(company);

        enforcer.set_default(&requester, sessions[0].id).await.unwrap();
        enforcer.unset_default(&requester, sessions[0].id).await.unwrap();

        assert!(default_ids(&store, company).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_default_checks_ownership() {
        let (_store, enforcer, _company, sessions) = setup().await;
        let outsider = Requester::company(Uuid::new_v4());

        let err = enforcer.set_default(&outsider, sessions[0].id).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_toggle_system_session_is_admin_only_and_not_exclusive() {
        let (store, enforcer, company, sessions) = setup().await;

        let user = Requester::company(company);
        assert!(matches!(
            enforcer.toggle_system_session(&user, sessions[0].id).await,
            Err(Error::Unauthorized(_))
        ));

        let admin = Requester::admin(company);
        assert!(enforcer.toggle_system_session(&admin, sessions[0].id).await.unwrap());
        assert!(enforcer.toggle_system_session(&admin, sessions[1].id).await.unwrap());

        // Two system sessions may coexist
        let list = store.list_by_company(company).await.unwrap();
        assert_eq!(list.iter().filter(|s| s.is_system_session).count(), 2);

        // Toggling again flips back
        assert!(!enforcer.toggle_system_session(&admin, sessions[0].id).await.unwrap());
    }

    #[tokio::test]
    async fn test_ignores_soft_deleted_sessions() {
        let (store, enforcer, company, sessions) = setup().await;
        let requester = Requester::company(company);

        enforcer.set_default(&requester, sessions[0].id).await.unwrap();
        store.soft_delete(sessions[0].id).await.unwrap();

        // The deleted default no longer participates in the invariant
        enforcer.set_default(&requester, sessions[1].id).await.unwrap();
        assert_eq!(default_ids(&store, company).await, vec![sessions[1].id]);
    }
}
