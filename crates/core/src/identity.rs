//! Signed-in user identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role as issued by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("USER"),
            Self::Admin => f.write_str("ADMIN"),
        }
    }
}

/// Display identity derived from an access token
///
/// Never stored on its own; it is recomputed whenever the access token changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl UserIdentity {
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
