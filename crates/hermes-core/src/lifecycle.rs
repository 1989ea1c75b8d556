//! Session Lifecycle Controller
//!
//! Accepts user-issued commands, validates preconditions (quota, ownership),
//! calls the gateway, and updates the store optimistically. The gateway holds
//! the authoritative status: every call here is acknowledgment-only, and the
//! persisted record is later confirmed or corrected by event ingress.

use crate::auth::Requester;
use crate::capacity::CapacityGuard;
use crate::error::{Error, Result};
use crate::events::{SessionEvent, TenantEventBus};
use crate::session::{Session, SessionStatus};
use crate::store::SessionStore;

use hermes_gateway::GatewayClient;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Gateway commands that share the ownership-check / call / optimistic-write
/// shape.
#[derive(Debug, Clone, Copy)]
enum GatewayOp {
    Stop,
    Restart,
    Logout,
}

/// Drives user-issued session commands against the gateway and the store.
pub struct LifecycleController {
    store: Arc<SessionStore>,
    gateway: Arc<dyn GatewayClient>,
    guard: CapacityGuard,
    bus: Arc<TenantEventBus>,
    /// Sessions with an outstanding command. No in-flight gateway call can be
    /// cancelled, so overlapping commands on one session are rejected here.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl LifecycleController {
    /// Create a new controller.
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn GatewayClient>,
        guard: CapacityGuard,
        bus: Arc<TenantEventBus>,
    ) -> Self {
        Self {
            store,
            gateway,
            guard,
            bus,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// List sessions visible to the requester. The all-tenants view is
    /// admin-only.
    pub async fn list(
        &self,
        requester: &Requester,
        include_all_tenants: bool,
    ) -> Result<Vec<Session>> {
        if include_all_tenants {
            requester.require_admin()?;
            self.store.list_all().await
        } else {
            self.store.list_by_company(requester.company_id).await
        }
    }

    /// Create a new session: quota-checked like `start`, then a gateway start
    /// for the fresh channel, then the local record in STARTING state.
    pub async fn create(
        &self,
        requester: &Requester,
        session_name: String,
        custom_name: Option<String>,
    ) -> Result<Session> {
        self.guard.check(&self.store, requester.company_id).await?;

        self.gateway_call(|| self.gateway.start(&session_name)).await?;

        let session = Session::new(requester.company_id, session_name, custom_name);
        self.store.insert(&session).await?;

        info!(session = %session.id, company = %session.company_id, "session created");
        self.publish_updated(&session);
        Ok(session)
    }

    /// Request connection start.
    ///
    /// Preconditions: session not WORKING, tenant has spare quota. On
    /// acknowledgment the persisted status is left untouched — the controller
    /// does not guess the next status, the gateway reports it via events.
    pub async fn start(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let _guard = self.begin(id)?;
        self.start_inner(requester, id).await
    }

    async fn start_inner(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let session = self.store.get(id).await?;
        requester.check_ownership(&session)?;

        if session.status == SessionStatus::Working {
            return Err(Error::InvalidState(
                "Session is already working".to_string(),
            ));
        }
        self.guard.check(&self.store, session.company_id).await?;

        self.gateway_call(|| self.gateway.start(&session.session_name))
            .await?;

        self.publish_updated(&session);
        Ok(())
    }

    /// Request connection pause. Allowed from any active state.
    ///
    /// If the gateway pushes a status event for the same session while this
    /// command persists its write, the last write wins; both converge to
    /// "not working", which is the accepted race.
    pub async fn stop(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let _guard = self.begin(id)?;
        self.command(requester, id, GatewayOp::Stop, SessionStatus::Stopped)
            .await
    }

    /// Request a gateway restart. Allowed from any state — this is the
    /// generic unstick operation, so the optimistic STARTING write may sit
    /// outside the event edge set.
    pub async fn restart(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let _guard = self.begin(id)?;
        self.command(requester, id, GatewayOp::Restart, SessionStatus::Starting)
            .await
    }

    /// Revoke the device pairing. Irreversible without a fresh QR scan; the
    /// gateway typically reports SCAN_QR_CODE next, we only record that the
    /// channel is no longer active.
    pub async fn logout(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let _guard = self.begin(id)?;
        self.command(requester, id, GatewayOp::Logout, SessionStatus::Stopped)
            .await
    }

    /// Request permanent gateway teardown and soft-delete the local record.
    /// Physical removal is the gateway's responsibility after confirmation.
    pub async fn delete(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let _guard = self.begin(id)?;
        self.delete_inner(requester, id).await
    }

    async fn delete_inner(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let session = self.store.get(id).await?;
        requester.check_ownership(&session)?;

        self.gateway_call(|| self.gateway.delete(&session.session_name))
            .await?;

        self.store.soft_delete(id).await?;
        info!(session = %id, "session soft-deleted");
        self.bus.publish(
            session.company_id,
            SessionEvent::SessionRemoved { session_id: id },
        );
        Ok(())
    }

    /// Rename the user-facing label. Local only, no gateway interaction.
    pub async fn rename(
        &self,
        requester: &Requester,
        id: Uuid,
        name: Option<String>,
    ) -> Result<()> {
        let session = self.store.get(id).await?;
        requester.check_ownership(&session)?;

        self.store.set_custom_name(id, name.as_deref()).await?;
        self.publish_updated(&session);
        Ok(())
    }

    /// Fetch the current QR pairing code for the session, if any.
    pub async fn get_qr(&self, requester: &Requester, id: Uuid) -> Result<Option<String>> {
        let session = self.store.get(id).await?;
        requester.check_ownership(&session)?;

        self.gateway_call(|| self.gateway.get_qr(&session.session_name))
            .await
    }

    /// Shared shape of stop/restart/logout: ownership check, gateway call,
    /// optimistic status write reflecting the command's intent.
    async fn command(
        &self,
        requester: &Requester,
        id: Uuid,
        op: GatewayOp,
        optimistic: SessionStatus,
    ) -> Result<()> {
        let session = self.store.get(id).await?;
        requester.check_ownership(&session)?;

        self.gateway_call(|| self.dispatch(op, &session.session_name))
            .await?;

        self.store.update_status(id, optimistic).await?;
        self.bus.publish(
            session.company_id,
            SessionEvent::SessionUpdated {
                session_id: id,
                status: optimistic,
            },
        );
        Ok(())
    }

    async fn dispatch(&self, op: GatewayOp, session_name: &str) -> hermes_gateway::Result<()> {
        match op {
            GatewayOp::Stop => self.gateway.stop(session_name).await,
            GatewayOp::Restart => self.gateway.restart(session_name).await,
            GatewayOp::Logout => self.gateway.logout(session_name).await,
        }
    }

    /// Run a gateway call, retrying once on a transient network failure only.
    /// All other failures surface immediately and leave the persisted status
    /// unchanged; the call may still have partially succeeded server-side, so
    /// the UI must re-query to observe truth.
    async fn gateway_call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = hermes_gateway::Result<T>>,
    {
        match op().await {
            Ok(value) => Ok(value),
            Err(e) if e.is_transient() => {
                warn!(error = %e, "transient gateway failure, retrying once");
                op().await.map_err(Error::from_gateway)
            }
            Err(e) => Err(Error::from_gateway(e)),
        }
    }

    fn publish_updated(&self, session: &Session) {
        self.bus.publish(
            session.company_id,
            SessionEvent::SessionUpdated {
                session_id: session.id,
                status: session.status,
            },
        );
    }

    fn begin(&self, id: Uuid) -> Result<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        if !in_flight.insert(id) {
            return Err(Error::OperationInFlight(id));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            id,
        })
    }
}

/// Clears the in-flight flag on drop, so the flag is released even when the
/// command future is cancelled mid-await (client disconnect).
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.id);
        }
    }
}
