//! Capacity guard: plan-derived limits on concurrently WORKING sessions.

use crate::error::{Error, Result};
use crate::store::SessionStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Maximum concurrently WORKING sessions a tenant's plan permits.
///
/// `Unknown` means the plan lookup failed. It admits the start (quota errors
/// must not block usage outright when the billing service is unreachable) but
/// stays distinguishable from a genuinely unlimited plan for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLimit {
    /// Plan permits up to this many WORKING sessions
    Known(u32),
    /// Plan has no session cap
    Unlimited,
    /// Plan lookup failed; limit could not be determined
    Unknown,
}

/// Subscription plan lookup — external collaborator.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    /// The tenant's current active-session limit.
    async fn active_session_limit(&self, company_id: Uuid) -> Result<SessionLimit>;
}

/// Enforces per-tenant session capacity before a start command reaches the
/// gateway. Read-only with respect to the session store.
pub struct CapacityGuard {
    plans: Arc<dyn PlanProvider>,
}

impl CapacityGuard {
    /// Create a new guard over a plan provider.
    pub fn new(plans: Arc<dyn PlanProvider>) -> Self {
        Self { plans }
    }

    /// Resolve the tenant's limit, failing open to `Unknown` on lookup errors.
    pub async fn limit_for(&self, company_id: Uuid) -> SessionLimit {
        match self.plans.active_session_limit(company_id).await {
            Ok(limit) => limit,
            Err(e) => {
                warn!(company = %company_id, error = %e, "plan lookup failed, treating limit as unknown");
                SessionLimit::Unknown
            }
        }
    }

    /// Check whether the tenant may bring one more session into WORKING.
    ///
    /// Counts the tenant's current WORKING sessions and rejects with
    /// `QuotaExceeded` when the plan limit is already reached. `Unknown`
    /// admits the start with an audit log line.
    pub async fn check(&self, store: &SessionStore, company_id: Uuid) -> Result<()> {
        match self.limit_for(company_id).await {
            SessionLimit::Unlimited => Ok(()),
            SessionLimit::Unknown => {
                warn!(company = %company_id, "admitting start with unknown session limit");
                Ok(())
            }
            SessionLimit::Known(limit) => {
                let working = store.count_working(company_id).await?;
                if working >= limit {
                    Err(Error::QuotaExceeded { limit })
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    /// Plan provider returning a scripted limit.
    struct FixedPlan(Result<SessionLimit>);

    #[async_trait]
    impl PlanProvider for FixedPlan {
        async fn active_session_limit(&self, _company_id: Uuid) -> Result<SessionLimit> {
            match &self.0 {
                Ok(limit) => Ok(*limit),
                Err(_) => Err(Error::GatewayUnreachable("billing down".to_string())),
            }
        }
    }

    fn guard(limit: SessionLimit) -> CapacityGuard {
        CapacityGuard::new(Arc::new(FixedPlan(Ok(limit))))
    }

    async fn seed_working(store: &SessionStore, company: Uuid, n: usize) {
        for i in 0..n {
            let s = Session::new(company, format!("s{i}"), None);
            store.insert(&s).await.unwrap();
            store
                .record_working(s.id, Some(&format!("{i}")), None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_under_limit_admits() {
        let store = SessionStore::in_memory().await.unwrap();
        let company = Uuid::new_v4();
        seed_working(&store, company, 1).await;

        assert!(guard(SessionLimit::Known(2)).check(&store, company).await.is_ok());
    }

    #[tokio::test]
    async fn test_at_limit_rejects() {
        let store = SessionStore::in_memory().await.unwrap();
        let company = Uuid::new_v4();
        seed_working(&store, company, 2).await;

        let err = guard(SessionLimit::Known(2))
            .check(&store, company)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { limit: 2 }));
    }

    #[tokio::test]
    async fn test_unlimited_always_admits() {
        let store = SessionStore::in_memory().await.unwrap();
        let company = Uuid::new_v4();
        seed_working(&store, company, 10).await;

        assert!(guard(SessionLimit::Unlimited).check(&store, company).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_open_as_unknown() {
        let store = SessionStore::in_memory().await.unwrap();
        let company = Uuid::new_v4();
        seed_working(&store, company, 5).await;

        let guard = CapacityGuard::new(Arc::new(FixedPlan(Err(Error::GatewayUnreachable(
            "billing down".to_string(),
        )))));

        // Unknown is reported as such, not collapsed into Unlimited
        assert_eq!(guard.limit_for(company).await, SessionLimit::Unknown);
        assert!(guard.check(&store, company).await.is_ok());
    }
}
