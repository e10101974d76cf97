//! The HTTP app (REST gateway + Connect binding) driven with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use userhub_auth::{Authenticator, TokenService};
use userhub_server::service::{AuthService, InstanceService, UserService};
use userhub_server::{AppState, router};
use userhub_store::{MemoryDriver, Store};

fn state() -> AppState {
    let store = Arc::new(Store::new(Arc::new(MemoryDriver::new())));
    let authenticator = Arc::new(Authenticator::new(TokenService::new("testsecret")));
    AppState {
        auth: Arc::new(AuthService::new(
            store.clone(),
            authenticator.clone(),
            time::Duration::days(7),
        )),
        users: Arc::new(UserService::new(store.clone())),
        instance: Arc::new(InstanceService::new(
            store.clone(),
            "0.0.0-test".to_string(),
            true,
        )),
        authenticator,
        store,
        demo: true,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn register_body(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "nickname": "Tester",
        "password": "password1",
        "phone": "13800138000",
        "email": email,
    })
}

#[tokio::test]
async fn test_health_probes() {
    let app = router(state());
    let response = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rest_register_login_profile_flow() {
    let app = router(state());

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/users", register_body("alice", "alice@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 0);
    assert_eq!(envelope["data"]["user"]["username"], "alice");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/login",
            json!({"username": "alice", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 0);
    let token = envelope["data"]["access_token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::get("/api/v1/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["data"]["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_rest_self_routes_update_profile_and_password() {
    let app = router(state());

    app.clone()
        .oneshot(post_json("/api/v1/users", register_body("alice", "alice@example.com")))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/login",
            json!({"username": "alice", "password": "password1"}),
        ))
        .await
        .unwrap();
    let envelope = body_json(response).await;
    let token = envelope["data"]["access_token"].as_str().unwrap().to_string();

    // The profile lives under /users/me and is edited with PATCH.
    let response = app
        .clone()
        .oneshot(
            Request::patch("/api/v1/users/me")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(json!({"nickname": "Alice B."}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 0);
    assert_eq!(envelope["data"]["user"]["nickname"], "Alice B.");

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/users/me/password")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(
                    json!({"old_password": "password1", "new_password": "password2"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/v1/auth/login",
            json!({"username": "alice", "password": "password2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 0);
}

#[tokio::test]
async fn test_rest_protected_route_without_token() {
    let app = router(state());
    let response = app
        .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 16);
    assert_eq!(envelope["message"], "authentication required");
}

#[tokio::test]
async fn test_rest_error_envelope_carries_code() {
    let app = router(state());
    // Duplicate registration surfaces the AlreadyExists state and a 409.
    app.clone()
        .oneshot(post_json("/api/v1/users", register_body("alice", "alice@example.com")))
        .await
        .unwrap();
    let response = app
        .oneshot(post_json("/api/v1/users", register_body("alice", "other@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let envelope = body_json(response).await;
    assert_eq!(envelope["state"], 6);
    assert_eq!(envelope["data"], Value::Null);
}

#[tokio::test]
async fn test_connect_flow_uses_bare_messages() {
    let app = router(state());

    let response = app
        .clone()
        .oneshot(post_json(
            "/userhub.api.v1.UserService/RegisterUser",
            register_body("alice", "alice@example.com"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // No envelope on the Connect binding.
    assert!(body.get("state").is_none());
    assert_eq!(body["user"]["username"], "alice");

    let response = app
        .clone()
        .oneshot(post_json(
            "/userhub.api.v1.AuthService/Login",
            json!({"username": "alice", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::post("/userhub.api.v1.UserService/GetUserProfile")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_connect_unauthenticated_error_shape() {
    let app = router(state());
    let response = app
        .oneshot(post_json("/userhub.api.v1.UserService/GetUserProfile", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["message"], "authentication required");
}

#[tokio::test]
async fn test_connect_service_error_shape() {
    let app = router(state());
    let response = app
        .oneshot(post_json(
            "/userhub.api.v1.AuthService/Login",
            json!({"username": "ghost", "password": "password1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["message"], "invalid username or password");
}

#[tokio::test]
async fn test_public_connect_route_ignores_bad_token() {
    let app = router(state());
    // A garbage token degrades to anonymous on public procedures.
    let response = app
        .oneshot(
            Request::post("/userhub.api.v1.InstanceService/GetInstanceProfile")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], "0.0.0-test");
    assert_eq!(body["demo"], true);
}

#[tokio::test]
async fn test_response_metadata_headers() {
    let app = router(state());
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache, no-store, must-revalidate"
    );
}
