//! The authenticated caller: either a password-authenticated user or an API
//! key, carrying a role and a write capability. A polymorphic sum type
//! rather than two parallel code paths, so every downstream check — the
//! authorization middleware, an audit log line — reads the same two fields
//! regardless of which credential produced them.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Identity {
    PasswordUser { id: String, username: String, role: Role, can_write: bool },
    ApiKey { id: String, role: Role, can_write: bool },
}

impl Identity {
    pub fn id(&self) -> &str {
        match self {
            Identity::PasswordUser { id, .. } | Identity::ApiKey { id, .. } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::PasswordUser { role, .. } | Identity::ApiKey { role, .. } => *role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// An admin implicitly has write capability regardless of the stored
    /// `can_write` flag.
    pub fn can_write(&self) -> bool {
        self.is_admin()
            || match self {
                Identity::PasswordUser { can_write, .. } | Identity::ApiKey { can_write, .. } => *can_write,
            }
    }

    /// `users:*`, `apikeys:*`, and `collections:*` operations require admin.
    pub fn can_manage_system_resources(&self) -> bool {
        self.is_admin()
    }
}
