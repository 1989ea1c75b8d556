//! Session storage using SQLite
//!
//! The durable record of each session's declared attributes. The store only
//! exposes per-record updates; cross-record invariants (single default per
//! tenant) are enforced above it by `DefaultEnforcer`.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{Session, SessionStatus};

/// SQLite-backed session store
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

/// Raw database row, converted into `Session` via `TryFrom`.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    session_name: String,
    custom_name: Option<String>,
    company_id: String,
    status: String,
    is_default: bool,
    is_system_session: bool,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    phone: Option<String>,
    push_name: Option<String>,
    avatar_url: Option<String>,
    started_at: Option<DateTime<Utc>>,
    created_date: DateTime<Utc>,
}

fn decode_err(msg: String) -> Error {
    Error::Database(sqlx::Error::Decode(msg.into()))
}

impl TryFrom<SessionRow> for Session {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| decode_err(format!("bad session id {}: {e}", row.id)))?;
        let company_id = Uuid::parse_str(&row.company_id)
            .map_err(|e| decode_err(format!("bad company id {}: {e}", row.company_id)))?;
        let status = SessionStatus::parse(&row.status)
            .ok_or_else(|| decode_err(format!("unknown status {}", row.status)))?;

        Ok(Session {
            id,
            session_name: row.session_name,
            custom_name: row.custom_name,
            company_id,
            status,
            is_default: row.is_default,
            is_system_session: row.is_system_session,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            phone: row.phone,
            push_name: row.push_name,
            avatar_url: row.avatar_url,
            started_at: row.started_at,
            created_date: row.created_date,
        })
    }
}

impl SessionStore {
    /// Create a new store from database path
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::InvalidConfig {
                field: "database_path".to_string(),
                message: format!("Failed to create directory: {e}"),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create an in-memory store (tests, local development).
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Underlying pool, shared with read-only collaborators (message log).
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                session_name TEXT NOT NULL UNIQUE,
                custom_name TEXT,
                company_id TEXT NOT NULL,
                status TEXT NOT NULL,
                is_default BOOLEAN NOT NULL DEFAULT FALSE,
                is_system_session BOOLEAN NOT NULL DEFAULT FALSE,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                deleted_at TIMESTAMP,
                phone TEXT,
                push_name TEXT,
                avatar_url TEXT,
                started_at TIMESTAMP,
                created_date TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_company ON sessions(company_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new session record
    pub async fn insert(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, session_name, custom_name, company_id, status,
                is_default, is_system_session, is_deleted, deleted_at,
                phone, push_name, avatar_url, started_at, created_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.session_name)
        .bind(&session.custom_name)
        .bind(session.company_id.to_string())
        .bind(session.status.as_str())
        .bind(session.is_default)
        .bind(session.is_system_session)
        .bind(session.is_deleted)
        .bind(session.deleted_at)
        .bind(&session.phone)
        .bind(&session.push_name)
        .bind(&session.avatar_url)
        .bind(session.started_at)
        .bind(session.created_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a non-deleted session by ID
    pub async fn get(&self, id: Uuid) -> Result<Session> {
        let row: SessionRow =
            sqlx::query_as("SELECT * FROM sessions WHERE id = ? AND is_deleted = FALSE")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Session {id} not found")))?;

        row.try_into()
    }

    /// Look up a non-deleted session by its gateway channel name within a tenant
    pub async fn get_by_name(
        &self,
        company_id: Uuid,
        session_name: &str,
    ) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT * FROM sessions WHERE company_id = ? AND session_name = ? AND is_deleted = FALSE",
        )
        .bind(company_id.to_string())
        .bind(session_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// List a tenant's non-deleted sessions
    pub async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT * FROM sessions WHERE company_id = ? AND is_deleted = FALSE ORDER BY created_date",
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Session::try_from).collect()
    }

    /// List every non-deleted session across tenants (admin view)
    pub async fn list_all(&self) -> Result<Vec<Session>> {
        let rows: Vec<SessionRow> =
            sqlx::query_as("SELECT * FROM sessions WHERE is_deleted = FALSE ORDER BY created_date")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Session::try_from).collect()
    }

    /// Count a tenant's non-deleted WORKING sessions
    pub async fn count_working(&self, company_id: Uuid) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE company_id = ? AND status = 'WORKING' AND is_deleted = FALSE",
        )
        .bind(company_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Update a session's status
    pub async fn update_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE sessions SET status = ? WHERE id = ? AND is_deleted = FALSE")
                .bind(status.as_str())
                .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Record a transition into WORKING.
    ///
    /// `phone` and `started_at` are write-once: set only if still null, never
    /// cleared by later STOPPED/FAILED transitions. `push_name` follows the
    /// latest gateway report.
    pub async fn record_working(
        &self,
        id: Uuid,
        phone: Option<&str>,
        push_name: Option<&str>,
    ) -> Result<()> {
        self.update_one(
            sqlx::query(
                r#"
                UPDATE sessions SET
                    status = 'WORKING',
                    phone = COALESCE(phone, ?),
                    push_name = COALESCE(?, push_name),
                    started_at = COALESCE(started_at, ?)
                WHERE id = ? AND is_deleted = FALSE
                "#,
            )
            .bind(phone)
            .bind(push_name)
            .bind(Utc::now())
            .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Rename the user-facing label
    pub async fn set_custom_name(&self, id: Uuid, name: Option<&str>) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE sessions SET custom_name = ? WHERE id = ? AND is_deleted = FALSE")
                .bind(name)
                .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Set or clear the default flag on a single record
    pub async fn set_default_flag(&self, id: Uuid, is_default: bool) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE sessions SET is_default = ? WHERE id = ? AND is_deleted = FALSE")
                .bind(is_default)
                .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Set or clear the system-session flag
    pub async fn set_system_flag(&self, id: Uuid, is_system: bool) -> Result<()> {
        self.update_one(
            sqlx::query(
                "UPDATE sessions SET is_system_session = ? WHERE id = ? AND is_deleted = FALSE",
            )
            .bind(is_system)
            .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Store a lazily fetched avatar URL
    pub async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE sessions SET avatar_url = ? WHERE id = ? AND is_deleted = FALSE")
                .bind(avatar_url)
                .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Re-parent a session to another tenant
    pub async fn set_company(&self, id: Uuid, company_id: Uuid) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE sessions SET company_id = ? WHERE id = ? AND is_deleted = FALSE")
                .bind(company_id.to_string())
                .bind(id.to_string()),
            id,
        )
        .await
    }

    /// Soft-delete a session. The record is retained for history and stats.
    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.update_one(
            sqlx::query(
                "UPDATE sessions SET is_deleted = TRUE, deleted_at = ? WHERE id = ? AND is_deleted = FALSE",
            )
            .bind(Utc::now())
            .bind(id.to_string()),
            id,
        )
        .await
    }

    async fn update_one<'a>(
        &self,
        query: sqlx::query::Query<'a, Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
        id: Uuid,
    ) -> Result<()> {
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Session {id} not found")));
        }
        Ok(())
    }
}
