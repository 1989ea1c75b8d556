//! Per-session message statistics.
//!
//! Joins the tenant's session collection against the message log, keyed by
//! the session's bound phone number. The log is fetched once per call and
//! indexed by number, so each session resolves in O(1) amortized instead of
//! re-filtering the log per session.

use crate::auth::Requester;
use crate::error::Result;
use crate::session::SessionStatus;
use crate::store::SessionStore;

use async_trait::async_trait;
use hermes_gateway::GatewayClient;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Message direction relative to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent from the session
    Sent,
    /// Received by the session
    Received,
}

/// One entry of the append-only message log.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Direction relative to the session
    pub direction: Direction,
    /// Phone number of the session that carried the message
    pub session_number: String,
}

/// Message log store — external collaborator, read-only here.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// The tenant's full message log.
    async fn list_messages(&self, company_id: Uuid) -> Result<Vec<MessageRecord>>;
}

/// Reads the CRM's message log table. The log is written elsewhere in the
/// product; this subsystem only aggregates it.
pub struct SqliteMessageLog {
    pool: Pool<Sqlite>,
}

impl SqliteMessageLog {
    /// Create over the shared database pool, ensuring the table exists so a
    /// fresh environment aggregates to zeros instead of erroring.
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                session_number TEXT NOT NULL,
                direction TEXT NOT NULL,
                created_date TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl MessageLog for SqliteMessageLog {
    async fn list_messages(&self, company_id: Uuid) -> Result<Vec<MessageRecord>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT direction, session_number FROM messages WHERE company_id = ?",
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(direction, session_number)| {
                let direction = match direction.as_str() {
                    "sent" => Direction::Sent,
                    "received" => Direction::Received,
                    other => {
                        debug!(direction = %other, "skipping log entry with unknown direction");
                        return None;
                    }
                };
                Some(MessageRecord {
                    direction,
                    session_number,
                })
            })
            .collect())
    }
}

/// Sent/received counts for one session. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Messages sent from the session
    pub sent: u64,
    /// Messages received by the session
    pub received: u64,
}

/// Computes per-session stats and backfills missing avatars as a best-effort
/// side task of the same pass.
pub struct StatsAggregator {
    store: Arc<SessionStore>,
    log: Arc<dyn MessageLog>,
    gateway: Arc<dyn GatewayClient>,
}

impl StatsAggregator {
    /// Create a new aggregator.
    pub fn new(
        store: Arc<SessionStore>,
        log: Arc<dyn MessageLog>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        Self { store, log, gateway }
    }

    /// Per-session `{sent, received}` for the requester's tenant.
    ///
    /// Sessions without a bound phone report zeros without scanning the log.
    pub async fn stats_for(&self, requester: &Requester) -> Result<HashMap<Uuid, SessionStats>> {
        let sessions = self.store.list_by_company(requester.company_id).await?;

        let mut by_number: HashMap<String, SessionStats> = HashMap::new();
        if sessions.iter().any(|s| s.phone.is_some()) {
            for record in self.log.list_messages(requester.company_id).await? {
                let entry = by_number.entry(record.session_number).or_default();
                match record.direction {
                    Direction::Sent => entry.sent += 1,
                    Direction::Received => entry.received += 1,
                }
            }
        }

        let mut stats = HashMap::with_capacity(sessions.len());
        for session in &sessions {
            let counts = session
                .phone
                .as_ref()
                .and_then(|phone| by_number.get(phone).copied())
                .unwrap_or_default();
            stats.insert(session.id, counts);
        }

        self.backfill_avatars(&sessions).await;

        Ok(stats)
    }

    /// Fetch profile photos for WORKING sessions that still lack one.
    /// Failures are logged and skipped, never surfaced as user errors.
    async fn backfill_avatars(&self, sessions: &[crate::session::Session]) {
        for session in sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Working && s.avatar_url.is_none())
        {
            match self.gateway.get_profile(&session.session_name).await {
                Ok(profile) => {
                    if let Some(picture) = profile.picture {
                        if let Err(e) = self.store.set_avatar(session.id, &picture).await {
                            warn!(session = %session.id, error = %e, "failed to store avatar");
                        }
                    }
                }
                Err(e) => {
                    warn!(session = %session.id, error = %e, "avatar lookup failed, skipping");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use hermes_gateway::ProfileInfo;

    struct FakeLog {
        records: Vec<MessageRecord>,
        calls: std::sync::Mutex<u32>,
    }

    impl FakeLog {
        fn new(records: Vec<MessageRecord>) -> Self {
            Self {
                records,
                calls: std::sync::Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl MessageLog for FakeLog {
        async fn list_messages(&self, _company_id: Uuid) -> Result<Vec<MessageRecord>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.records.clone())
        }
    }

    struct FakeGateway {
        picture: Option<String>,
        fail: bool,
    }

    #[async_trait]
    impl GatewayClient for FakeGateway {
        async fn start(&self, _s: &str) -> hermes_gateway::Result<()> {
            Ok(())
        }
        async fn stop(&self, _s: &str) -> hermes_gateway::Result<()> {
            Ok(())
        }
        async fn restart(&self, _s: &str) -> hermes_gateway::Result<()> {
            Ok(())
        }
        async fn logout(&self, _s: &str) -> hermes_gateway::Result<()> {
            Ok(())
        }
        async fn delete(&self, _s: &str) -> hermes_gateway::Result<()> {
            Ok(())
        }
        async fn get_profile(&self, _s: &str) -> hermes_gateway::Result<ProfileInfo> {
            if self.fail {
                return Err(hermes_gateway::Error::Network("down".to_string()));
            }
            Ok(ProfileInfo {
                picture: self.picture.clone(),
                push_name: None,
            })
        }
        async fn get_qr(&self, _s: &str) -> hermes_gateway::Result<Option<String>> {
            Ok(None)
        }
    }

    fn record(direction: Direction, number: &str) -> MessageRecord {
        MessageRecord {
            direction,
            session_number: number.to_string(),
        }
    }

    async fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_stats_join_by_phone() {
        let company = Uuid::new_v4();
        let store = store().await;

        let bound = Session::new(company, "bound".to_string(), None);
        store.insert(&bound).await.unwrap();
        store
            .record_working(bound.id, Some("111"), None)
            .await
            .unwrap();
        store
            .update_status(bound.id, SessionStatus::Stopped)
            .await
            .unwrap();

        let phoneless = Session::new(company, "fresh".to_string(), None);
        store.insert(&phoneless).await.unwrap();

        let log = Arc::new(FakeLog::new(vec![
            record(Direction::Sent, "111"),
            record(Direction::Sent, "111"),
            record(Direction::Sent, "111"),
            record(Direction::Received, "111"),
            record(Direction::Received, "111"),
            // Entries for other numbers must not count
            record(Direction::Sent, "222"),
            record(Direction::Sent, "222"),
            record(Direction::Received, "333"),
            record(Direction::Received, "333"),
            record(Direction::Sent, "444"),
        ]));
        let aggregator = StatsAggregator::new(
            store,
            log,
            Arc::new(FakeGateway {
                picture: None,
                fail: false,
            }),
        );

        let stats = aggregator
            .stats_for(&Requester::company(company))
            .await
            .unwrap();

        assert_eq!(stats[&bound.id], SessionStats { sent: 3, received: 2 });
        assert_eq!(stats[&phoneless.id], SessionStats::default());
    }

    #[tokio::test]
    async fn test_log_is_not_scanned_when_no_session_has_a_phone() {
        let company = Uuid::new_v4();
        let store = store().await;
        let phoneless = Session::new(company, "fresh".to_string(), None);
        store.insert(&phoneless).await.unwrap();

        let log = Arc::new(FakeLog::new(vec![record(Direction::Sent, "111")]));
        let aggregator = StatsAggregator::new(
            store,
            log.clone(),
            Arc::new(FakeGateway {
                picture: None,
                fail: false,
            }),
        );

        let stats = aggregator
            .stats_for(&Requester::company(company))
            .await
            .unwrap();

        assert_eq!(stats[&phoneless.id], SessionStats::default());
        assert_eq!(*log.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_avatar_backfill_for_working_sessions() {
        let company = Uuid::new_v4();
        let store = store().await;
        let session = Session::new(company, "main".to_string(), None);
        store.insert(&session).await.unwrap();
        store
            .record_working(session.id, Some("111"), None)
            .await
            .unwrap();

        let aggregator = StatsAggregator::new(
            store.clone(),
            Arc::new(FakeLog::new(Vec::new())),
            Arc::new(FakeGateway {
                picture: Some("https://cdn.example/avatar.jpg".to_string()),
                fail: false,
            }),
        );

        aggregator
            .stats_for(&Requester::company(company))
            .await
            .unwrap();

        let stored = store.get(session.id).await.unwrap();
        assert_eq!(
            stored.avatar_url.as_deref(),
            Some("https://cdn.example/avatar.jpg")
        );
    }

    #[tokio::test]
    async fn test_avatar_lookup_failure_is_not_surfaced() {
        let company = Uuid::new_v4();
        let store = store().await;
        let session = Session::new(company, "main".to_string(), None);
        store.insert(&session).await.unwrap();
        store
            .record_working(session.id, Some("111"), None)
            .await
            .unwrap();

        let aggregator = StatsAggregator::new(
            store.clone(),
            Arc::new(FakeLog::new(Vec::new())),
            Arc::new(FakeGateway {
                picture: None,
                fail: true,
            }),
        );

        // The pass still succeeds
        aggregator
            .stats_for(&Requester::company(company))
            .await
            .unwrap();
        assert!(store.get(session.id).await.unwrap().avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_message_log_roundtrip() {
        let company = Uuid::new_v4();
        let store = store().await;
        let log = SqliteMessageLog::new(store.pool().clone()).await.unwrap();

        sqlx::query(
            "INSERT INTO messages (id, company_id, session_number, direction, created_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(company.to_string())
        .bind("111")
        .bind("sent")
        .bind(chrono::Utc::now())
        .execute(store.pool())
        .await
        .unwrap();

        let records = log.list_messages(company).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].direction, Direction::Sent);
        assert_eq!(records[0].session_number, "111");
    }
}
