//! Session model: one tenant-owned connection to the messaging gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gateway-reported status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Connection is being established
    Starting,
    /// Waiting for the user to scan the pairing QR code
    ScanQrCode,
    /// Connected and bound to a phone number
    Working,
    /// Paused by the user or the gateway
    Stopped,
    /// The gateway reported a failure
    Failed,
}

impl SessionStatus {
    /// Stable text form used for persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Starting => "STARTING",
            SessionStatus::ScanQrCode => "SCAN_QR_CODE",
            SessionStatus::Working => "WORKING",
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Failed => "FAILED",
        }
    }

    /// Parse the persisted text form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STARTING" => Some(SessionStatus::Starting),
            "SCAN_QR_CODE" => Some(SessionStatus::ScanQrCode),
            "WORKING" => Some(SessionStatus::Working),
            "STOPPED" => Some(SessionStatus::Stopped),
            "FAILED" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    /// Whether a gateway-reported transition from `self` to `to` follows a
    /// legal edge. Event ingress is restricted to this edge set; replaying
    /// the same status is a no-op, not an edge.
    #[must_use]
    pub fn can_transition(&self, to: SessionStatus) -> bool {
        use SessionStatus::{Failed, ScanQrCode, Starting, Stopped, Working};
        matches!(
            (self, to),
            (Starting, ScanQrCode | Working | Failed)
                | (ScanQrCode, Working | Failed | Stopped)
                | (Working, Stopped | Failed)
                | (Stopped, Starting)
                | (Failed, Starting)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external gateway connection owned by one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,
    /// Gateway-side channel identifier (immutable once created)
    pub session_name: String,
    /// User-facing label (mutable)
    pub custom_name: Option<String>,
    /// Owning tenant — the unit of quota enforcement and access scoping
    pub company_id: Uuid,
    /// Current gateway-reported status
    pub status: SessionStatus,
    /// At most one `true` per tenant among non-deleted sessions
    pub is_default: bool,
    /// Marks sessions backing shared/automated flows (no uniqueness)
    pub is_system_session: bool,
    /// Soft-delete flag; records are never physically removed here
    pub is_deleted: bool,
    /// When the session was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
    /// Real-world number, set once on first WORKING and retained afterwards
    pub phone: Option<String>,
    /// Display name the paired account advertises
    pub push_name: Option<String>,
    /// Profile picture URL, fetched lazily once WORKING
    pub avatar_url: Option<String>,
    /// Set on first transition into WORKING
    pub started_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_date: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session record in STARTING state.
    #[must_use]
    pub fn new(company_id: Uuid, session_name: String, custom_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_name,
            custom_name,
            company_id,
            status: SessionStatus::Starting,
            is_default: false,
            is_system_session: false,
            is_deleted: false,
            deleted_at: None,
            phone: None,
            push_name: None,
            avatar_url: None,
            started_at: None,
            created_date: Utc::now(),
        }
    }
}
