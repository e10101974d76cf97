//! Domain models for users and refresh tokens.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Parses a role string; unknown values map to `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user row. `deleted_at` non-`None` excludes the row from all lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    /// Argon2 hash, never the plaintext password.
    pub password_hash: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
    pub password_expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub nickname: String,
    pub password_hash: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
    pub password_expires_at: OffsetDateTime,
}

/// Partial user update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub id: i64,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct FindUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteUser {
    pub id: i64,
}

/// A persisted refresh token. Single-use: rotated (revoked and replaced)
/// on every successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    /// The opaque token string handed to the client.
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub revoked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl RefreshToken {
    /// A token is valid only while it is unrevoked and unexpired.
    /// Once revoked it can never become valid again.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.revoked && OffsetDateTime::now_utc() < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRefreshToken {
    pub id: i64,
    pub revoked: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FindRefreshToken {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteRefreshToken {
    pub id: i64,
}
