//! Authenticated user models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Organization-wide role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemRole {
    /// Full control over the organization.
    Admin,
    /// Manages registered databases.
    DbAdmin,
    /// Read-only access.
    User,
}

impl SystemRole {
    /// Roles allowed to modify registered databases.
    pub const DATABASE_WRITERS: &'static [SystemRole] = &[SystemRole::Admin, SystemRole::DbAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "ADMIN",
            SystemRole::DbAdmin => "DBADMIN",
            SystemRole::User => "USER",
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(SystemRole::Admin),
            "DBADMIN" => Ok(SystemRole::DbAdmin),
            "USER" => Ok(SystemRole::User),
            other => Err(format!("unknown system role '{other}'")),
        }
    }
}

/// A user as seen by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Organization every request of this user is scoped to.
    pub org_id: i64,
    pub system_role: SystemRole,
}

impl User {
    /// Fails with [`AppError::Forbidden`] unless the user holds one of `roles`.
    pub fn require_any_role(&self, roles: &[SystemRole]) -> AppResult<()> {
        if roles.contains(&self.system_role) {
            return Ok(());
        }
        let allowed = roles
            .iter()
            .map(SystemRole::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::Forbidden(format!(
            "role {} is not allowed, requires one of: {}",
            self.system_role, allowed
        )))
    }
}

/// A user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub org_id: i64,
    pub system_role: SystemRole,
    /// Bearer token the user authenticates with; stores keep only its digest.
    pub api_token: String,
}
