//! Database models for users.

use crate::api::models::users::{AdminUserUpdate, Role, UserStatus};
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub status: UserStatus,
    pub password_hash: Option<String>,
    pub external_purchase_id: Option<String>,
}

impl UserCreateDBRequest {
    /// A regular, active account that must change its password on first login.
    pub fn member(email: impl Into<String>, name: impl Into<String>, password_hash: String) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role: Role::User,
            status: UserStatus::Active,
            password_hash: Some(password_hash),
            external_purchase_id: None,
        }
    }
}

/// Database request for updating a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub password_hash: Option<String>,
    pub first_login: Option<bool>,
    pub external_purchase_id: Option<String>,
}

impl From<AdminUserUpdate> for UserUpdateDBRequest {
    fn from(update: AdminUserUpdate) -> Self {
        Self {
            name: update.name,
            role: update.role,
            status: update.status,
            ..Default::default()
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub first_login: bool,
    pub consent_at: Option<DateTime<Utc>>,
    pub external_purchase_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
