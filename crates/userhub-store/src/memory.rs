//! In-memory [`Driver`] used by the demo server and the test suite.
//!
//! Stands in for the SQL backends behind the same trait. Enforces the same
//! uniqueness constraints a schema would: usernames, emails and refresh
//! token strings are unique among live rows.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::driver::{Driver, StoreError, StoreResult};
use crate::model::{
    DeleteRefreshToken, DeleteUser, FindRefreshToken, FindUser, NewRefreshToken, NewUser,
    RefreshToken, UpdateRefreshToken, UpdateUser, User,
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    next_user_id: i64,
    tokens: BTreeMap<i64, RefreshToken>,
    next_token_id: i64,
}

#[derive(Default)]
pub struct MemoryDriver {
    inner: RwLock<Inner>,
}

impl MemoryDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_user(user: &User, find: &FindUser) -> bool {
    if user.deleted_at.is_some() {
        return false;
    }
    if let Some(id) = find.id {
        if user.id != id {
            return false;
        }
    }
    if let Some(ref username) = find.username {
        if &user.username != username {
            return false;
        }
    }
    if let Some(ref email) = find.email {
        if &user.email != email {
            return false;
        }
    }
    if let Some(role) = find.role {
        if user.role != role {
            return false;
        }
    }
    true
}

fn matches_token(token: &RefreshToken, find: &FindRefreshToken) -> bool {
    if let Some(id) = find.id {
        if token.id != id {
            return false;
        }
    }
    if let Some(user_id) = find.user_id {
        if token.user_id != user_id {
            return false;
        }
    }
    if let Some(ref t) = find.token {
        if &token.token != t {
            return false;
        }
    }
    true
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, create: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let live = inner.users.values().filter(|u| u.deleted_at.is_none());
        for user in live {
            if user.username == create.username {
                return Err(StoreError::conflict("username already exists"));
            }
            if user.email == create.email {
                return Err(StoreError::conflict("email already exists"));
            }
        }

        inner.next_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_user_id,
            username: create.username,
            nickname: create.nickname,
            password_hash: create.password_hash,
            phone: create.phone,
            email: create.email,
            role: create.role,
            password_expires_at: create.password_expires_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, update: UpdateUser) -> StoreResult<User> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        if let Some(ref email) = update.email {
            if inner
                .users
                .values()
                .any(|u| u.deleted_at.is_none() && u.id != update.id && &u.email == email)
            {
                return Err(StoreError::conflict("email already exists"));
            }
        }
        if let Some(ref username) = update.username {
            if inner
                .users
                .values()
                .any(|u| u.deleted_at.is_none() && u.id != update.id && &u.username == username)
            {
                return Err(StoreError::conflict("username already exists"));
            }
        }

        let user = inner
            .users
            .get_mut(&update.id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("user not found"))?;

        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(nickname) = update.nickname {
            user.nickname = nickname;
        }
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(phone) = update.phone {
            user.phone = phone;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(password_expires_at) = update.password_expires_at {
            user.password_expires_at = password_expires_at;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn list_users(&self, find: FindUser) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .users
            .values()
            .filter(|u| matches_user(u, &find))
            .cloned()
            .collect())
    }

    async fn delete_user(&self, delete: DeleteUser) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let user = inner
            .users
            .get_mut(&delete.id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("user not found"))?;
        user.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn create_refresh_token(&self, create: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.tokens.values().any(|t| t.token == create.token) {
            return Err(StoreError::conflict("refresh token already exists"));
        }

        inner.next_token_id += 1;
        let now = OffsetDateTime::now_utc();
        let token = RefreshToken {
            id: inner.next_token_id,
            user_id: create.user_id,
            token: create.token,
            expires_at: create.expires_at,
            revoked: false,
            created_at: now,
            updated_at: now,
        };
        inner.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn update_refresh_token(&self, update: UpdateRefreshToken) -> StoreResult<RefreshToken> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let token = inner
            .tokens
            .get_mut(&update.id)
            .ok_or_else(|| StoreError::not_found("refresh token not found"))?;
        if let Some(revoked) = update.revoked {
            token.revoked = revoked;
        }
        token.updated_at = OffsetDateTime::now_utc();
        Ok(token.clone())
    }

    async fn get_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.tokens.values().find(|t| t.token == token).cloned())
    }

    async fn list_refresh_tokens(&self, find: FindRefreshToken) -> StoreResult<Vec<RefreshToken>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .tokens
            .values()
            .filter(|t| matches_token(t, &find))
            .cloned()
            .collect())
    }

    async fn delete_refresh_token(&self, delete: DeleteRefreshToken) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.tokens.remove(&delete.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            nickname: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            phone: "13800138000".to_string(),
            email: email.to_string(),
            role: crate::Role::User,
            password_expires_at: OffsetDateTime::now_utc() + Duration::days(90),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let driver = MemoryDriver::new();
        let user = driver.create_user(new_user("alice", "alice@x.com")).await.unwrap();
        assert_eq!(user.id, 1);

        let found = driver.get_user_by_username("alice").await.unwrap();
        assert_eq!(found.as_ref().map(|u| u.id), Some(user.id));
        let found = driver.get_user_by_email("alice@x.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(driver.get_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let driver = MemoryDriver::new();
        driver.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        let err = driver.create_user(new_user("alice", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        let err = driver.create_user(new_user("bob", "alice@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_user() {
        let driver = MemoryDriver::new();
        let user = driver.create_user(new_user("alice", "alice@x.com")).await.unwrap();
        driver.delete_user(DeleteUser { id: user.id }).await.unwrap();

        assert!(driver.get_user_by_username("alice").await.unwrap().is_none());
        assert!(driver.list_users(FindUser::default()).await.unwrap().is_empty());
        // The username becomes reusable after the soft delete.
        driver.create_user(new_user("alice", "alice2@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_user_partial() {
        let driver = MemoryDriver::new();
        let user = driver.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        let updated = driver
            .update_user(UpdateUser {
                id: user.id,
                nickname: Some("Alice L.".to_string()),
                ..UpdateUser::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.nickname, "Alice L.");
        assert_eq!(updated.email, "alice@x.com");
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let driver = MemoryDriver::new();
        let created = driver
            .create_refresh_token(NewRefreshToken {
                user_id: 1,
                token: "opaque".to_string(),
                expires_at: OffsetDateTime::now_utc() + Duration::days(7),
            })
            .await
            .unwrap();
        assert!(!created.revoked);

        let fetched = driver.get_refresh_token("opaque").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);

        let revoked = driver
            .update_refresh_token(UpdateRefreshToken {
                id: created.id,
                revoked: Some(true),
            })
            .await
            .unwrap();
        assert!(revoked.revoked);

        // Duplicate token strings are rejected as defense-in-depth.
        let err = driver
            .create_refresh_token(NewRefreshToken {
                user_id: 2,
                token: "opaque".to_string(),
                expires_at: OffsetDateTime::now_utc() + Duration::days(7),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }
}
