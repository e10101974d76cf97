//! User registration and profile management.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use userhub_api::messages::{
    ChangePasswordRequest, ChangePasswordResponse, GetUserProfileResponse, RegisterUserRequest,
    RegisterUserResponse, UpdateUserProfileRequest, UpdateUserProfileResponse,
};
use userhub_auth::{UserClaims, password};
use userhub_store::{FindUser, NewUser, Role, Store, UpdateUser, User};

use super::{ServiceError, to_api_user};

/// Passwords must be changed after this many days.
const PASSWORD_EXPIRY_DAYS: i64 = 90;

pub struct UserService {
    store: Arc<Store>,
}

impl UserService {
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates a user account with the default role.
    pub async fn register(&self, req: RegisterUserRequest) -> Result<RegisterUserResponse, ServiceError> {
        validate_username(&req.username)?;
        validate_nickname(&req.nickname)?;
        validate_password(&req.password)?;
        validate_phone(&req.phone)?;
        validate_email(&req.email)?;

        if self.store.get_user_by_username(&req.username).await?.is_some() {
            return Err(ServiceError::already_exists("username already taken"));
        }
        if self.store.get_user_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::already_exists("email already registered"));
        }

        let password_hash = password::hash_password(&req.password)
            .map_err(|e| ServiceError::internal(format!("password hashing failed: {e}")))?;
        // The driver re-checks uniqueness, so a racing registration surfaces
        // as AlreadyExists rather than a duplicate row.
        let user = self
            .store
            .create_user(NewUser {
                username: req.username,
                nickname: req.nickname,
                password_hash,
                phone: req.phone,
                email: req.email,
                role: Role::User,
                password_expires_at: OffsetDateTime::now_utc()
                    + Duration::days(PASSWORD_EXPIRY_DAYS),
            })
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(RegisterUserResponse {
            user: Some(to_api_user(&user)),
        })
    }

    pub async fn get_profile(&self, claims: &UserClaims) -> Result<GetUserProfileResponse, ServiceError> {
        let user = self.fetch(claims.user_id).await?;
        Ok(GetUserProfileResponse {
            user: Some(to_api_user(&user)),
        })
    }

    /// Applies the non-empty fields of the request; empty fields are left
    /// unchanged.
    pub async fn update_profile(
        &self,
        claims: &UserClaims,
        req: UpdateUserProfileRequest,
    ) -> Result<UpdateUserProfileResponse, ServiceError> {
        if req.nickname.is_empty() && req.phone.is_empty() && req.email.is_empty() {
            return Err(ServiceError::invalid_argument("nothing to update"));
        }

        let mut update = UpdateUser {
            id: claims.user_id,
            ..UpdateUser::default()
        };
        if !req.nickname.is_empty() {
            validate_nickname(&req.nickname)?;
            update.nickname = Some(req.nickname);
        }
        if !req.phone.is_empty() {
            validate_phone(&req.phone)?;
            update.phone = Some(req.phone);
        }
        if !req.email.is_empty() {
            validate_email(&req.email)?;
            if let Some(existing) = self.store.get_user_by_email(&req.email).await? {
                if existing.id != claims.user_id {
                    return Err(ServiceError::already_exists("email already registered"));
                }
            }
            update.email = Some(req.email);
        }

        let user = self.store.update_user(update).await?;
        Ok(UpdateUserProfileResponse {
            user: Some(to_api_user(&user)),
        })
    }

    /// Replaces the password after verifying the old one; renews the expiry
    /// window.
    pub async fn change_password(
        &self,
        claims: &UserClaims,
        req: ChangePasswordRequest,
    ) -> Result<ChangePasswordResponse, ServiceError> {
        if req.old_password.is_empty() {
            return Err(ServiceError::invalid_argument("old_password is required"));
        }
        validate_password(&req.new_password)?;

        let user = self.fetch(claims.user_id).await?;
        let matches = password::verify_password(&req.old_password, &user.password_hash)
            .map_err(|e| ServiceError::internal(format!("password verification failed: {e}")))?;
        if !matches {
            return Err(ServiceError::unauthenticated("old password is incorrect"));
        }

        let password_hash = password::hash_password(&req.new_password)
            .map_err(|e| ServiceError::internal(format!("password hashing failed: {e}")))?;
        let user = self
            .store
            .update_user(UpdateUser {
                id: user.id,
                password_hash: Some(password_hash),
                password_expires_at: Some(
                    OffsetDateTime::now_utc() + Duration::days(PASSWORD_EXPIRY_DAYS),
                ),
                ..UpdateUser::default()
            })
            .await?;
        tracing::info!(user_id = user.id, "password changed");
        Ok(ChangePasswordResponse {
            user: Some(to_api_user(&user)),
        })
    }

    async fn fetch(&self, id: i64) -> Result<User, ServiceError> {
        self.store
            .get_user(FindUser {
                id: Some(id),
                ..FindUser::default()
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("user not found"))
    }
}

// =============================================================================
// Field validation
// =============================================================================

fn validate_username(value: &str) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ServiceError::invalid_argument(
            "username must be 3-50 characters",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ServiceError::invalid_argument(
            "username may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn validate_nickname(value: &str) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if !(1..=50).contains(&len) {
        return Err(ServiceError::invalid_argument(
            "nickname must be 1-50 characters",
        ));
    }
    Ok(())
}

fn validate_password(value: &str) -> Result<(), ServiceError> {
    if !(6..=72).contains(&value.len()) {
        return Err(ServiceError::invalid_argument(
            "password must be 6-72 characters",
        ));
    }
    Ok(())
}

fn validate_phone(value: &str) -> Result<(), ServiceError> {
    if value.len() != 11 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::invalid_argument("phone must be 11 digits"));
    }
    Ok(())
}

fn validate_email(value: &str) -> Result<(), ServiceError> {
    let shape_ok = value.len() <= 100
        && !value.contains(char::is_whitespace)
        && value
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
            });
    if !shape_ok {
        return Err(ServiceError::invalid_argument("invalid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("alice_01").is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("13800138000").is_ok());
        assert!(validate_phone("1380013800").is_err());
        assert!(validate_phone("13800x38000").is_err());
        assert!(validate_phone("+8613800138").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("a@b@example.com").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(100))).is_err());
    }
}
