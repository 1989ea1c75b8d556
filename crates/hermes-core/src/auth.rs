//! Request scoping: which tenant is acting, and with what privilege.

use crate::error::{Error, Result};
use crate::session::Session;
use uuid::Uuid;

/// The acting tenant for an operation.
///
/// All session access checks `company_id == session.company_id || admin`.
#[derive(Debug, Clone)]
pub struct Requester {
    /// Tenant the request acts on behalf of
    pub company_id: Uuid,
    /// Whether the request carries admin privilege
    pub admin: bool,
}

impl Requester {
    /// A plain tenant-scoped requester.
    #[must_use]
    pub fn company(company_id: Uuid) -> Self {
        Self {
            company_id,
            admin: false,
        }
    }

    /// An admin requester acting for the given tenant.
    #[must_use]
    pub fn admin(company_id: Uuid) -> Self {
        Self {
            company_id,
            admin: true,
        }
    }

    /// Verify the requester owns the session or is admin.
    pub fn check_ownership(&self, session: &Session) -> Result<()> {
        if self.admin || session.company_id == self.company_id {
            Ok(())
        } else {
            Err(Error::Unauthorized(
                "Not authorized to access this session".to_string(),
            ))
        }
    }

    /// Verify the requester is admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.admin {
            Ok(())
        } else {
            Err(Error::Unauthorized("admin privilege required".to_string()))
        }
    }
}
