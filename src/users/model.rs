use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::access::{RoleSet, ValidRole};

/// An authenticated actor as seen by the rest of the service.
///
/// This is the read-only view of a stored user: no credentials, only what
/// access checks and presence need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub roles: RoleSet,
    pub is_active: bool,
}

impl Principal {
    pub fn display_name(&self) -> &str {
        &self.full_name
    }
}

/// A stored user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.to_string(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            roles: self.roles.clone(),
            is_active: self.is_active,
        }
    }
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

impl NewUser {
    /// New accounts start with the plain `user` role.
    pub fn with_default_roles(
        email: impl Into<String>,
        full_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            password_hash: password_hash.into(),
            roles: [ValidRole::User].as_slice().into(),
        }
    }

    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            is_active: true,
            roles: self.roles,
            created_at: Utc::now(),
        }
    }
}
