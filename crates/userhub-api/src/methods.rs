//! Canonical RPC method names and the public-method registry.
//!
//! Every transport binding derives its authorization lookup key from the
//! constants here: gRPC and Connect use the procedure path directly, the
//! REST gateway maps each route onto the procedure it fronts. A method that
//! is public on one transport is therefore public on all of them.

pub const AUTH_LOGIN: &str = "/userhub.api.v1.AuthService/Login";
pub const AUTH_REFRESH_TOKEN: &str = "/userhub.api.v1.AuthService/RefreshToken";
pub const AUTH_VALIDATE_TOKEN: &str = "/userhub.api.v1.AuthService/ValidateToken";
pub const AUTH_LOGOUT: &str = "/userhub.api.v1.AuthService/Logout";

pub const USER_REGISTER: &str = "/userhub.api.v1.UserService/RegisterUser";
pub const USER_GET_PROFILE: &str = "/userhub.api.v1.UserService/GetUserProfile";
pub const USER_UPDATE_PROFILE: &str = "/userhub.api.v1.UserService/UpdateUserProfile";
pub const USER_CHANGE_PASSWORD: &str = "/userhub.api.v1.UserService/ChangePassword";

pub const INSTANCE_GET_PROFILE: &str = "/userhub.api.v1.InstanceService/GetInstanceProfile";

/// Service names as registered with the gRPC router.
pub const AUTH_SERVICE: &str = "userhub.api.v1.AuthService";
pub const USER_SERVICE: &str = "userhub.api.v1.UserService";
pub const INSTANCE_SERVICE: &str = "userhub.api.v1.InstanceService";

/// Returns `true` if the procedure is reachable without authentication.
///
/// Exact string match on the full procedure name.
#[must_use]
pub fn is_public_method(procedure: &str) -> bool {
    matches!(
        procedure,
        AUTH_LOGIN | AUTH_REFRESH_TOKEN | AUTH_VALIDATE_TOKEN | USER_REGISTER | INSTANCE_GET_PROFILE
    )
}
