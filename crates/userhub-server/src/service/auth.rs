//! Session lifecycle: login, refresh rotation, validation, logout.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use userhub_api::messages::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshTokenRequest,
    RefreshTokenResponse, ValidateTokenRequest, ValidateTokenResponse,
};
use userhub_auth::{Authenticator, generate_refresh_token, password};
use userhub_store::{FindUser, NewRefreshToken, Store, UpdateRefreshToken, User};

use super::{ServiceError, to_api_user};

/// A freshly issued token pair.
struct Session {
    access_token: String,
    refresh_token: String,
    access_token_expires_at: i64,
}

pub struct AuthService {
    store: Arc<Store>,
    authenticator: Arc<Authenticator>,
    refresh_ttl: Duration,
}

impl AuthService {
    #[must_use]
    pub fn new(store: Arc<Store>, authenticator: Arc<Authenticator>, refresh_ttl: Duration) -> Self {
        Self {
            store,
            authenticator,
            refresh_ttl,
        }
    }

    /// Verifies credentials and opens a session.
    ///
    /// Bad username and bad password produce the same message so the
    /// response does not reveal which accounts exist.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        if req.username.is_empty() || req.password.is_empty() {
            return Err(ServiceError::invalid_argument(
                "username and password are required",
            ));
        }
        let user = self
            .store
            .get_user_by_username(&req.username)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("invalid username or password"))?;
        let matches = password::verify_password(&req.password, &user.password_hash)
            .map_err(|e| ServiceError::internal(format!("password verification failed: {e}")))?;
        if !matches {
            return Err(ServiceError::unauthenticated("invalid username or password"));
        }
        if user.password_expires_at <= OffsetDateTime::now_utc() {
            return Err(ServiceError::unauthenticated(
                "password expired, change it before logging in",
            ));
        }

        let session = self.issue_session(&user).await?;
        tracing::info!(user_id = user.id, username = %user.username, "login");
        Ok(LoginResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            access_token_expires_at: session.access_token_expires_at,
            user: Some(to_api_user(&user)),
        })
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// Rotate-on-use: the presented token is revoked before its replacement
    /// is issued. The two writes are not atomic; a crash in between leaves
    /// the client logged out, never with two live tokens.
    pub async fn refresh_token(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, ServiceError> {
        if req.refresh_token.is_empty() {
            return Err(ServiceError::invalid_argument("refresh_token is required"));
        }
        let stored = self
            .store
            .get_refresh_token(&req.refresh_token)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("invalid refresh token"))?;
        if !stored.is_valid() {
            return Err(ServiceError::unauthenticated("invalid refresh token"));
        }
        let user = self
            .store
            .get_user(FindUser {
                id: Some(stored.user_id),
                ..FindUser::default()
            })
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("invalid refresh token"))?;

        self.store
            .update_refresh_token(UpdateRefreshToken {
                id: stored.id,
                revoked: Some(true),
            })
            .await?;
        let session = self.issue_session(&user).await?;
        tracing::debug!(user_id = user.id, "refresh token rotated");
        Ok(RefreshTokenResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            access_token_expires_at: session.access_token_expires_at,
            user: Some(to_api_user(&user)),
        })
    }

    /// Stateless check of an access token.
    #[must_use]
    pub fn validate_token(&self, req: ValidateTokenRequest) -> ValidateTokenResponse {
        let valid = !req.token.is_empty()
            && self
                .authenticator
                .token_service()
                .validate_access_token(&req.token)
                .is_ok();
        ValidateTokenResponse { valid }
    }

    /// Access tokens are stateless, so logout confirms the token and leaves
    /// expiry to do the rest. Clients drop their refresh token locally.
    #[must_use]
    pub fn logout(&self, req: LogoutRequest) -> LogoutResponse {
        let success = self
            .authenticator
            .token_service()
            .validate_access_token(&req.token)
            .is_ok();
        LogoutResponse { success }
    }

    async fn issue_session(&self, user: &User) -> Result<Session, ServiceError> {
        let tokens = self.authenticator.token_service();
        let access_token = tokens
            .issue_access_token(user.id, &user.username, user.role.as_str())
            .map_err(|e| ServiceError::internal(format!("token signing failed: {e}")))?;
        let now = OffsetDateTime::now_utc();
        let refresh_token = generate_refresh_token();
        self.store
            .create_refresh_token(NewRefreshToken {
                user_id: user.id,
                token: refresh_token.clone(),
                expires_at: now + self.refresh_ttl,
            })
            .await?;
        Ok(Session {
            access_token,
            refresh_token,
            access_token_expires_at: (now + tokens.access_ttl()).unix_timestamp(),
        })
    }
}
