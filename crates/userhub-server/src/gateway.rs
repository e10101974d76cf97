//! REST gateway: JSON over HTTP/1.1 with the unified response envelope.
//!
//! Each route fronts exactly one RPC procedure; [`method_for`] is the
//! mapping the authorization middleware uses to look a route up in the
//! public-method registry.

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use userhub_api::messages::{
    ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshTokenRequest, RegisterUserRequest,
    UpdateUserProfileRequest, ValidateTokenRequest,
};
use userhub_api::{Envelope, methods};
use userhub_auth::UserClaims;

use crate::AppState;
use crate::service::ServiceError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh_token))
        .route("/api/v1/auth/validate", post(validate_token))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/users", post(register))
        .route("/api/v1/users/me", get(get_profile).patch(update_profile))
        .route("/api/v1/users/me/password", post(change_password))
        .route("/api/v1/instance/profile", get(instance_profile))
}

/// Maps a gateway route onto the procedure it fronts. Routes that are not
/// listed here (health probes) carry no authorization semantics.
#[must_use]
pub fn method_for(method: &Method, path: &str) -> Option<&'static str> {
    match (method.as_str(), path) {
        ("POST", "/api/v1/auth/login") => Some(methods::AUTH_LOGIN),
        ("POST", "/api/v1/auth/refresh") => Some(methods::AUTH_REFRESH_TOKEN),
        ("POST", "/api/v1/auth/validate") => Some(methods::AUTH_VALIDATE_TOKEN),
        ("POST", "/api/v1/auth/logout") => Some(methods::AUTH_LOGOUT),
        ("POST", "/api/v1/users") => Some(methods::USER_REGISTER),
        ("GET", "/api/v1/users/me") => Some(methods::USER_GET_PROFILE),
        ("PATCH", "/api/v1/users/me") => Some(methods::USER_UPDATE_PROFILE),
        ("POST", "/api/v1/users/me/password") => Some(methods::USER_CHANGE_PASSWORD),
        ("GET", "/api/v1/instance/profile") => Some(methods::INSTANCE_GET_PROFILE),
        _ => None,
    }
}

/// Service error rendered as an envelope with the mapped HTTP status.
pub struct RestError(ServiceError);

impl From<ServiceError> for RestError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(Envelope::error(code, self.0.to_string()))).into_response()
    }
}

type RestResult = Result<Json<Envelope>, RestError>;

// =============================================================================
// Handlers
// =============================================================================

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> RestResult {
    Ok(Json(Envelope::ok(state.auth.login(req).await?)))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> RestResult {
    Ok(Json(Envelope::ok(state.auth.refresh_token(req).await?)))
}

async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateTokenRequest>,
) -> RestResult {
    Ok(Json(Envelope::ok(state.auth.validate_token(req))))
}

async fn logout(State(state): State<AppState>, Json(req): Json<LogoutRequest>) -> RestResult {
    Ok(Json(Envelope::ok(state.auth.logout(req))))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> RestResult {
    Ok(Json(Envelope::ok(state.users.register(req).await?)))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> RestResult {
    Ok(Json(Envelope::ok(state.users.get_profile(&claims).await?)))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<UpdateUserProfileRequest>,
) -> RestResult {
    Ok(Json(Envelope::ok(
        state.users.update_profile(&claims, req).await?,
    )))
}

async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<ChangePasswordRequest>,
) -> RestResult {
    Ok(Json(Envelope::ok(
        state.users.change_password(&claims, req).await?,
    )))
}

async fn instance_profile(State(state): State<AppState>) -> RestResult {
    Ok(Json(Envelope::ok(state.instance.get_profile().await?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_maps_to_a_procedure() {
        assert_eq!(
            method_for(&Method::POST, "/api/v1/auth/login"),
            Some(methods::AUTH_LOGIN)
        );
        assert_eq!(
            method_for(&Method::GET, "/api/v1/users/me"),
            Some(methods::USER_GET_PROFILE)
        );
        assert_eq!(
            method_for(&Method::PATCH, "/api/v1/users/me"),
            Some(methods::USER_UPDATE_PROFILE)
        );
        assert_eq!(
            method_for(&Method::POST, "/api/v1/users/me/password"),
            Some(methods::USER_CHANGE_PASSWORD)
        );
    }

    #[test]
    fn test_probes_and_unknown_routes_have_no_procedure() {
        assert_eq!(method_for(&Method::GET, "/healthz"), None);
        assert_eq!(method_for(&Method::GET, "/readyz"), None);
        assert_eq!(method_for(&Method::DELETE, "/api/v1/users"), None);
        // The verb is part of the mapping, not just the path.
        assert_eq!(method_for(&Method::GET, "/api/v1/auth/login"), None);
        assert_eq!(method_for(&Method::PUT, "/api/v1/users/me"), None);
    }
}
