//! The service layer shared by every transport binding.
//!
//! Each binding is a thin codec around these methods; validation, lookup and
//! mutation logic lives here exactly once.

pub mod auth;
pub mod error;
pub mod instance;
pub mod user;

pub use auth::AuthService;
pub use error::ServiceError;
pub use instance::InstanceService;
pub use user::UserService;

/// Projects a stored user onto the wire representation. The password hash
/// and soft-delete marker never leave the store layer.
pub(crate) fn to_api_user(user: &userhub_store::User) -> userhub_api::messages::User {
    userhub_api::messages::User {
        id: user.id,
        username: user.username.clone(),
        nickname: user.nickname.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        role: user.role.as_str().to_string(),
        password_expires_at: user.password_expires_at.unix_timestamp(),
        created_at: user.created_at.unix_timestamp(),
        updated_at: user.updated_at.unix_timestamp(),
    }
}
