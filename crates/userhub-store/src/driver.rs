//! The pluggable persistence interface.

use async_trait::async_trait;

use crate::model::{
    DeleteRefreshToken, DeleteUser, FindRefreshToken, FindUser, NewRefreshToken, NewUser,
    RefreshToken, UpdateRefreshToken, UpdateUser, User,
};

/// Errors surfaced by storage backends.
///
/// "Not found" on single-row lookups is not an error; those methods return
/// `Ok(None)` instead. `NotFound` is reserved for mutations that target a
/// missing row.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// A mutation targeted a row that does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The backend failed.
    #[error("storage error: {message}")]
    Internal { message: String },
}

impl StoreError {
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD backend consumed by [`crate::Store`].
///
/// Implementations must be safe for concurrent use by many request tasks.
/// Soft-deleted users are excluded from every lookup.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
    async fn close(&self) -> StoreResult<()>;

    async fn create_user(&self, create: NewUser) -> StoreResult<User>;
    async fn update_user(&self, update: UpdateUser) -> StoreResult<User>;
    async fn list_users(&self, find: FindUser) -> StoreResult<Vec<User>>;
    async fn delete_user(&self, delete: DeleteUser) -> StoreResult<()>;
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_refresh_token(&self, create: NewRefreshToken) -> StoreResult<RefreshToken>;
    async fn update_refresh_token(&self, update: UpdateRefreshToken) -> StoreResult<RefreshToken>;
    async fn get_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;
    async fn list_refresh_tokens(&self, find: FindRefreshToken) -> StoreResult<Vec<RefreshToken>>;
    async fn delete_refresh_token(&self, delete: DeleteRefreshToken) -> StoreResult<()>;
}
