//! Connect-RPC binding: unary JSON over HTTP/1.1.
//!
//! Routes live at the canonical procedure paths, so the authorization
//! middleware can use the request path as the registry key directly.
//! Responses are the bare message; errors use the Connect error shape
//! `{"code", "message"}` with the standard code-to-HTTP mapping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use userhub_api::messages::{
    ChangePasswordRequest, ChangePasswordResponse, GetUserProfileRequest, GetUserProfileResponse,
    InstanceProfile, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse,
    RefreshTokenRequest, RefreshTokenResponse, RegisterUserRequest, RegisterUserResponse,
    UpdateUserProfileRequest, UpdateUserProfileResponse, ValidateTokenRequest,
    ValidateTokenResponse,
};
use userhub_api::methods;
use userhub_auth::UserClaims;

use crate::AppState;
use crate::service::ServiceError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(methods::AUTH_LOGIN, post(login))
        .route(methods::AUTH_REFRESH_TOKEN, post(refresh_token))
        .route(methods::AUTH_VALIDATE_TOKEN, post(validate_token))
        .route(methods::AUTH_LOGOUT, post(logout))
        .route(methods::USER_REGISTER, post(register))
        .route(methods::USER_GET_PROFILE, post(get_profile))
        .route(methods::USER_UPDATE_PROFILE, post(update_profile))
        .route(methods::USER_CHANGE_PASSWORD, post(change_password))
        .route(methods::INSTANCE_GET_PROFILE, post(instance_profile))
}

/// Service error rendered in the Connect wire shape.
pub struct ConnectError(ServiceError);

impl From<ServiceError> for ConnectError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "code": code.connect_code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ConnectError> {
    Ok(Json(state.auth.login(req).await?))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ConnectError> {
    Ok(Json(state.auth.refresh_token(req).await?))
}

async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, ConnectError> {
    Ok(Json(state.auth.validate_token(req)))
}

async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, ConnectError> {
    Ok(Json(state.auth.logout(req)))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, ConnectError> {
    Ok(Json(state.users.register(req).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(_req): Json<GetUserProfileRequest>,
) -> Result<Json<GetUserProfileResponse>, ConnectError> {
    Ok(Json(state.users.get_profile(&claims).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<UpdateUserProfileRequest>,
) -> Result<Json<UpdateUserProfileResponse>, ConnectError> {
    Ok(Json(state.users.update_profile(&claims, req).await?))
}

async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, ConnectError> {
    Ok(Json(state.users.change_password(&claims, req).await?))
}

async fn instance_profile(
    State(state): State<AppState>,
) -> Result<Json<InstanceProfile>, ConnectError> {
    Ok(Json(state.instance.get_profile().await?))
}
