//! Cross-cutting request middleware.
//!
//! All three bindings enforce the same policy: the axum middleware
//! [`authenticate`] covers the REST gateway and the Connect routes, and
//! [`AuthLayer`] wraps the tonic router for gRPC. Both are thin adapters
//! around `userhub_auth::authorize`.

use std::any::Any;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures_util::future::{Either, Ready, ready};
use http_body_util::Full;
use tower_http::catch_panic::ResponseForPanic;
use userhub_api::{Envelope, ErrorCode};
use userhub_auth::{Authenticator, authorize};
use uuid::Uuid;

use crate::AppState;
use crate::gateway;

const CONNECT_PREFIX: &str = "/userhub.api.v1.";

/// Stamps a request id onto the response and disables response caching,
/// matching the metadata the other bindings' clients expect.
pub async fn metadata(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

/// HTTP-side authorization adapter.
///
/// Resolves the request to a canonical procedure name (Connect paths are
/// used verbatim, gateway routes go through the route map), runs the shared
/// policy and either attaches the claims or rejects in the binding's own
/// error shape.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(method) = method_key(req.method(), req.uri().path()) else {
        // Health probes and unknown routes carry no authorization semantics.
        return next.run(req).await;
    };
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match authorize(&state.authenticator, auth_header.as_deref(), &method) {
        Ok(Some(claims)) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(_) => unauthenticated_response(req.uri().path()),
    }
}

fn method_key(method: &Method, path: &str) -> Option<String> {
    if path.starts_with(CONNECT_PREFIX) {
        Some(path.to_string())
    } else {
        gateway::method_for(method, path).map(str::to_string)
    }
}

fn unauthenticated_response(path: &str) -> Response {
    let code = ErrorCode::Unauthenticated;
    if path.starts_with(CONNECT_PREFIX) {
        let body = serde_json::json!({
            "code": code.connect_code(),
            "message": "authentication required",
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::error(code, "authentication required")),
        )
            .into_response()
    }
}

// =============================================================================
// gRPC authorization layer
// =============================================================================

/// Tower layer enforcing the policy on the gRPC binding.
///
/// A tonic interceptor never sees the request URI, so this wraps the whole
/// router where the full `/package.Service/Method` path is still available.
#[derive(Clone)]
pub struct AuthLayer {
    authenticator: Arc<Authenticator>,
}

impl AuthLayer {
    #[must_use]
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> tower::Layer<S> for AuthLayer {
    type Service = GrpcAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcAuth {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GrpcAuth<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
}

impl<S, B> tower::Service<http::Request<B>> for GrpcAuth<S>
where
    S: tower::Service<http::Request<B>, Response = http::Response<tonic::body::BoxBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Either<S::Future, Ready<Result<Self::Response, Self::Error>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let method = req.uri().path().to_string();
        let auth_header = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match authorize(&self.authenticator, auth_header.as_deref(), &method) {
            Ok(claims) => {
                if let Some(claims) = claims {
                    req.extensions_mut().insert(claims);
                }
                Either::Left(self.inner.call(req))
            }
            Err(_) => Either::Right(ready(Ok(grpc_unauthenticated()))),
        }
    }
}

/// Trailers-only rejection; per the gRPC protocol the HTTP status stays 200
/// and the status travels in `grpc-status`.
fn grpc_unauthenticated() -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert(
        tonic::Status::GRPC_STATUS,
        (tonic::Code::Unauthenticated as i32).into(),
    );
    headers.insert(
        "grpc-message",
        http::HeaderValue::from_static("authentication required"),
    );
    headers.insert(http::header::CONTENT_TYPE, tonic::metadata::GRPC_CONTENT_TYPE);
    response
}

// =============================================================================
// Panic recovery
// =============================================================================

/// Converts a handler panic into an Internal envelope. Demo deployments log
/// the panic payload; production logs only the fact.
#[derive(Clone, Copy)]
pub struct PanicResponder {
    pub verbose: bool,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Full<Bytes>;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        log_panic(self.verbose, err.as_ref());

        let envelope = Envelope::error(ErrorCode::Internal, "internal error");
        let body = serde_json::to_vec(&envelope).unwrap_or_default();
        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// gRPC-side counterpart to [`PanicResponder`]: a panicking handler becomes
/// a trailers-only Internal status instead of a torn-down connection.
#[derive(Clone, Copy)]
pub struct GrpcPanicResponder {
    pub verbose: bool,
}

impl ResponseForPanic for GrpcPanicResponder {
    type ResponseBody = Full<Bytes>;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        log_panic(self.verbose, err.as_ref());

        let mut response = http::Response::new(Full::new(Bytes::new()));
        let headers = response.headers_mut();
        headers.insert(
            tonic::Status::GRPC_STATUS,
            (tonic::Code::Internal as i32).into(),
        );
        headers.insert(
            "grpc-message",
            http::HeaderValue::from_static("internal error"),
        );
        headers.insert(http::header::CONTENT_TYPE, tonic::metadata::GRPC_CONTENT_TYPE);
        response
    }
}

fn log_panic(verbose: bool, err: &(dyn Any + Send)) {
    if verbose {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.as_str()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s
        } else {
            "unknown panic payload"
        };
        tracing::error!(panic = %detail, "request handler panicked");
    } else {
        tracing::error!("request handler panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{Layer, Service, ServiceExt};
    use userhub_api::methods;
    use userhub_auth::{TokenService, UserClaims};

    fn auth_layer() -> AuthLayer {
        AuthLayer::new(Arc::new(Authenticator::new(TokenService::new("testsecret"))))
    }

    fn echo_claims_service() -> impl tower::Service<
        http::Request<tonic::body::BoxBody>,
        Response = http::Response<tonic::body::BoxBody>,
        Error = std::convert::Infallible,
    > + Clone {
        tower::service_fn(|req: http::Request<tonic::body::BoxBody>| async move {
            let mut response = http::Response::new(tonic::body::empty_body());
            if req.extensions().get::<UserClaims>().is_some() {
                response
                    .headers_mut()
                    .insert("x-claims", http::HeaderValue::from_static("1"));
            }
            Ok::<_, std::convert::Infallible>(response)
        })
    }

    fn request(path: &str, bearer: Option<&str>) -> http::Request<tonic::body::BoxBody> {
        let mut builder = http::Request::builder().uri(path);
        if let Some(token) = bearer {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(tonic::body::empty_body()).unwrap()
    }

    #[tokio::test]
    async fn test_protected_method_without_token_gets_trailers_only_rejection() {
        let mut svc = auth_layer().layer(echo_claims_service());
        let response = svc
            .ready()
            .await
            .unwrap()
            .call(request(methods::USER_GET_PROFILE, None))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers().get("grpc-status").unwrap(), "16");
    }

    #[tokio::test]
    async fn test_public_method_without_token_reaches_inner_service() {
        let mut svc = auth_layer().layer(echo_claims_service());
        let response = svc
            .ready()
            .await
            .unwrap()
            .call(request(methods::AUTH_LOGIN, None))
            .await
            .unwrap();
        assert!(response.headers().get("grpc-status").is_none());
        assert!(response.headers().get("x-claims").is_none());
    }

    #[tokio::test]
    async fn test_valid_token_attaches_claims() {
        let layer = auth_layer();
        let token = layer
            .authenticator
            .token_service()
            .issue_access_token(1, "alice", "user")
            .unwrap();
        let mut svc = layer.layer(echo_claims_service());
        let response = svc
            .ready()
            .await
            .unwrap()
            .call(request(methods::USER_GET_PROFILE, Some(&token)))
            .await
            .unwrap();
        assert!(response.headers().get("grpc-status").is_none());
        assert_eq!(response.headers().get("x-claims").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_panicking_grpc_handler_still_answers_with_internal_status() {
        use tower_http::catch_panic::CatchPanicLayer;

        let panicking = tower::service_fn(|_req: http::Request<tonic::body::BoxBody>| async move {
            if true {
                panic!("handler blew up");
            }
            Ok::<_, std::convert::Infallible>(http::Response::new(tonic::body::empty_body()))
        });
        let mut svc =
            CatchPanicLayer::custom(GrpcPanicResponder { verbose: true }).layer(panicking);
        let response = svc
            .ready()
            .await
            .unwrap()
            .call(request(methods::USER_GET_PROFILE, None))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers().get("grpc-status").unwrap(), "13");
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/grpc"
        );
    }
}
