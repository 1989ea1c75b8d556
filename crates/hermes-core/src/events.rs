//! Tenant-scoped event bus for session updates.
//!
//! UI clients subscribe to their own tenant's channel only; there is no
//! global callback registry, so events never leak across tenants. Uses
//! `tokio::broadcast` so multiple subscribers receive the same events and
//! slow subscribers lag rather than blocking the publisher.

use crate::session::SessionStatus;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default per-tenant channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Events emitted when a tenant's session collection changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A single session's stored record changed
    SessionUpdated {
        /// Session identifier
        session_id: Uuid,
        /// Status after the change
        status: SessionStatus,
    },
    /// A session was soft-deleted
    SessionRemoved {
        /// Session identifier
        session_id: Uuid,
    },
    /// The whole tenant collection was reloaded after a gateway push
    SessionsReloaded {
        /// Number of live sessions after the reload
        count: usize,
    },
}

/// Per-tenant broadcast channels.
pub struct TenantEventBus {
    capacity: usize,
    channels: RwLock<HashMap<Uuid, broadcast::Sender<SessionEvent>>>,
}

impl TenantEventBus {
    /// Create a bus with the given per-tenant channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to one tenant's events. Each subscriber gets an independent
    /// copy of every event published for that tenant.
    pub fn subscribe(&self, company_id: Uuid) -> broadcast::Receiver<SessionEvent> {
        let mut channels = self.channels.write().expect("event bus lock poisoned");
        channels
            .entry(company_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to one tenant's subscribers.
    ///
    /// Returns the number of subscribers that received it. Tenants without
    /// an open channel drop the event silently; a channel whose subscribers
    /// have all dropped is pruned here so the map does not grow unbounded.
    pub fn publish(&self, company_id: Uuid, event: SessionEvent) -> usize {
        let delivered = {
            let channels = self.channels.read().expect("event bus lock poisoned");
            match channels.get(&company_id) {
                Some(sender) => sender.send(event).unwrap_or(0),
                None => return 0,
            }
        };

        if delivered == 0 {
            let mut channels = self.channels.write().expect("event bus lock poisoned");
            // Re-check under the write lock: a subscriber may have arrived
            if channels
                .get(&company_id)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                channels.remove(&company_id);
            }
        }
        delivered
    }

    /// Current number of subscribers for a tenant.
    #[must_use]
    pub fn subscriber_count(&self, company_id: Uuid) -> usize {
        let channels = self.channels.read().expect("event bus lock poisoned");
        channels
            .get(&company_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for TenantEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = TenantEventBus::new(16);
        let company = Uuid::new_v4();
        let mut rx = bus.subscribe(company);

        let session_id = Uuid::new_v4();
        bus.publish(
            company,
            SessionEvent::SessionUpdated {
                session_id,
                status: SessionStatus::Working,
            },
        );

        match rx.recv().await.unwrap() {
            SessionEvent::SessionUpdated { session_id: id, status } => {
                assert_eq!(id, session_id);
                assert_eq!(status, SessionStatus::Working);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_cross_tenant_leakage() {
        let bus = TenantEventBus::new(16);
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        let mut rx_b = bus.subscribe(company_b);

        let delivered = bus.publish(
            company_a,
            SessionEvent::SessionsReloaded { count: 3 },
        );
        assert_eq!(delivered, 0);

        // Nothing arrives on the other tenant's channel
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = TenantEventBus::default();
        let company = Uuid::new_v4();
        let mut rx1 = bus.subscribe(company);
        let mut rx2 = bus.subscribe(company);

        assert_eq!(bus.subscriber_count(company), 2);

        let delivered = bus.publish(company, SessionEvent::SessionsReloaded { count: 1 });
        assert_eq!(delivered, 2);

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_channel_is_pruned_once_all_subscribers_drop() {
        let bus = TenantEventBus::new(16);
        let company = Uuid::new_v4();

        let rx = bus.subscribe(company);
        assert_eq!(bus.channels.read().unwrap().len(), 1);
        drop(rx);

        bus.publish(company, SessionEvent::SessionsReloaded { count: 0 });
        assert!(bus.channels.read().unwrap().is_empty());
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bus = TenantEventBus::new(16);
        let delivered = bus.publish(
            Uuid::new_v4(),
            SessionEvent::SessionRemoved {
                session_id: Uuid::new_v4(),
            },
        );
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::SessionUpdated {
            session_id: Uuid::nil(),
            status: SessionStatus::ScanQrCode,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"session_updated\""));
        assert!(json.contains("SCAN_QR_CODE"));
    }
}
