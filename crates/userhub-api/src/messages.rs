//! Wire messages for the `userhub.api.v1` services.
//!
//! These are hand-maintained prost messages (no build-time codegen); field
//! tags are part of the wire contract and must never be reused. Timestamps
//! are unix seconds.

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub username: String,
    #[prost(string, tag = "3")]
    pub nickname: String,
    #[prost(string, tag = "4")]
    pub email: String,
    #[prost(string, tag = "5")]
    pub phone: String,
    /// "admin" or "user".
    #[prost(string, tag = "6")]
    pub role: String,
    #[prost(int64, tag = "7")]
    pub password_expires_at: i64,
    #[prost(int64, tag = "8")]
    pub created_at: i64,
    #[prost(int64, tag = "9")]
    pub updated_at: i64,
}

// =============================================================================
// UserService
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterUserRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub nickname: String,
    #[prost(string, tag = "3")]
    pub password: String,
    #[prost(string, tag = "4")]
    pub phone: String,
    #[prost(string, tag = "5")]
    pub email: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterUserResponse {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetUserProfileRequest {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetUserProfileResponse {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
}

/// Empty fields are left unchanged.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateUserProfileRequest {
    #[prost(string, tag = "1")]
    pub nickname: String,
    #[prost(string, tag = "2")]
    pub phone: String,
    #[prost(string, tag = "3")]
    pub email: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateUserProfileResponse {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    #[prost(string, tag = "1")]
    pub old_password: String,
    #[prost(string, tag = "2")]
    pub new_password: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePasswordResponse {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
}

// =============================================================================
// AuthService
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
    #[prost(int64, tag = "3")]
    pub access_token_expires_at: i64,
    #[prost(message, optional, tag = "4")]
    pub user: Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshTokenResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
    #[prost(int64, tag = "3")]
    pub access_token_expires_at: i64,
    #[prost(message, optional, tag = "4")]
    pub user: Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateTokenRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateTokenResponse {
    #[prost(bool, tag = "1")]
    pub valid: bool,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

// =============================================================================
// InstanceService
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetInstanceProfileRequest {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceProfile {
    #[prost(string, tag = "1")]
    pub version: String,
    #[prost(bool, tag = "2")]
    pub demo: bool,
    /// The first registered admin user, if any.
    #[prost(message, optional, tag = "3")]
    pub admin: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_protobuf_round_trip() {
        let req = LoginRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };
        let bytes = req.encode_to_vec();
        let decoded = LoginRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn test_json_missing_fields_default() {
        // Connect clients may omit empty proto3 fields in JSON.
        let req: UpdateUserProfileRequest = serde_json::from_str(r#"{"nickname":"Al"}"#).unwrap();
        assert_eq!(req.nickname, "Al");
        assert!(req.phone.is_empty());
        assert!(req.email.is_empty());
    }

    #[test]
    fn test_optional_user_omitted_in_proto() {
        let resp = RegisterUserResponse { user: None };
        let bytes = resp.encode_to_vec();
        assert!(bytes.is_empty());
    }
}
