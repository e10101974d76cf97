//! Driver wrapper that shields the backend with short-TTL caches.
//!
//! User-by-ID lookups are read-through cached; every user mutation deletes
//! the corresponding entry rather than updating it in place, so a stale
//! write can never be cached. Lookups by username/email bypass the cache
//! (they participate in uniqueness checks and must see the backend).

use std::sync::Arc;

use crate::cache::{CacheConfig, TtlCache};
use crate::driver::{Driver, StoreResult};
use crate::model::{
    DeleteRefreshToken, DeleteUser, FindRefreshToken, FindUser, NewRefreshToken, NewUser,
    RefreshToken, Role, UpdateRefreshToken, UpdateUser, User,
};

const FIRST_ADMIN_KEY: &str = "first-admin";

pub struct Store {
    driver: Arc<dyn Driver>,
    user_cache: TtlCache<User>,
    instance_cache: TtlCache<User>,
}

impl Store {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_cache_config(driver, CacheConfig::default())
    }

    pub fn with_cache_config(driver: Arc<dyn Driver>, config: CacheConfig) -> Self {
        Self {
            driver,
            user_cache: TtlCache::new(config),
            instance_cache: TtlCache::new(config),
        }
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.driver.ping().await
    }

    /// Closes the caches, then the driver. The store must not be used
    /// afterwards.
    pub async fn close(&self) -> StoreResult<()> {
        self.user_cache.close().await;
        self.instance_cache.close().await;
        self.driver.close().await
    }

    fn user_key(id: i64) -> String {
        id.to_string()
    }

    fn invalidate_user(&self, id: i64) {
        self.user_cache.delete(&Self::user_key(id));
        // The admin shown in the instance profile may have changed.
        self.instance_cache.delete(FIRST_ADMIN_KEY);
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn create_user(&self, create: NewUser) -> StoreResult<User> {
        let user = self.driver.create_user(create).await?;
        self.user_cache.set(&Self::user_key(user.id), user.clone());
        self.instance_cache.delete(FIRST_ADMIN_KEY);
        Ok(user)
    }

    /// Single-user lookup; `Ok(None)` when no row matches.
    pub async fn get_user(&self, find: FindUser) -> StoreResult<Option<User>> {
        if let Some(id) = find.id {
            if let Some(user) = self.user_cache.get(&Self::user_key(id)) {
                return Ok(Some(user));
            }
        }
        let by_id = find.id;
        let mut list = self.driver.list_users(find).await?;
        if list.is_empty() {
            return Ok(None);
        }
        let user = list.swap_remove(0);
        if by_id.is_some() {
            self.user_cache.set(&Self::user_key(user.id), user.clone());
        }
        Ok(Some(user))
    }

    pub async fn list_users(&self, find: FindUser) -> StoreResult<Vec<User>> {
        self.driver.list_users(find).await
    }

    pub async fn update_user(&self, update: UpdateUser) -> StoreResult<User> {
        let user = self.driver.update_user(update).await?;
        self.invalidate_user(user.id);
        Ok(user)
    }

    pub async fn delete_user(&self, delete: DeleteUser) -> StoreResult<()> {
        self.driver.delete_user(delete).await?;
        self.invalidate_user(delete.id);
        Ok(())
    }

    pub async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.driver.get_user_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.driver.get_user_by_email(email).await
    }

    /// The first admin user, cached for the instance profile.
    pub async fn first_admin_user(&self) -> StoreResult<Option<User>> {
        if let Some(user) = self.instance_cache.get(FIRST_ADMIN_KEY) {
            return Ok(Some(user));
        }
        let mut admins = self
            .driver
            .list_users(FindUser {
                role: Some(Role::Admin),
                ..FindUser::default()
            })
            .await?;
        if admins.is_empty() {
            return Ok(None);
        }
        let admin = admins.swap_remove(0);
        self.instance_cache.set(FIRST_ADMIN_KEY, admin.clone());
        Ok(Some(admin))
    }

    // =========================================================================
    // Refresh tokens
    // =========================================================================

    pub async fn create_refresh_token(&self, create: NewRefreshToken) -> StoreResult<RefreshToken> {
        self.driver.create_refresh_token(create).await
    }

    pub async fn update_refresh_token(&self, update: UpdateRefreshToken) -> StoreResult<RefreshToken> {
        self.driver.update_refresh_token(update).await
    }

    pub async fn get_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        self.driver.get_refresh_token(token).await
    }

    pub async fn list_refresh_tokens(&self, find: FindRefreshToken) -> StoreResult<Vec<RefreshToken>> {
        self.driver.list_refresh_tokens(find).await
    }

    pub async fn delete_refresh_token(&self, delete: DeleteRefreshToken) -> StoreResult<()> {
        self.driver.delete_refresh_token(delete).await
    }
}
