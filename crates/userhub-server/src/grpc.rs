//! gRPC binding: hand-wired tonic services over the shared message types.
//!
//! The message structs in `userhub-api` are hand-maintained prost derives,
//! so the service plumbing here follows the same shape `tonic-build` emits:
//! one router service per gRPC service, dispatching on the request path into
//! a `Grpc::unary` call with a prost codec.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tonic::server::NamedService;
use userhub_api::messages::{
    ChangePasswordRequest, ChangePasswordResponse, GetInstanceProfileRequest,
    GetUserProfileRequest, GetUserProfileResponse, InstanceProfile, LoginRequest, LoginResponse,
    LogoutRequest, LogoutResponse, RefreshTokenRequest, RefreshTokenResponse, RegisterUserRequest,
    RegisterUserResponse, UpdateUserProfileRequest, UpdateUserProfileResponse,
    ValidateTokenRequest, ValidateTokenResponse,
};
use userhub_api::methods;
use userhub_auth::UserClaims;

use crate::service::{AuthService, InstanceService, UserService};

type BoxFuture<T, E> = Pin<Box<dyn std::future::Future<Output = Result<T, E>> + Send + 'static>>;
type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The authorization layer runs before the router, so a missing principal
/// on a protected method means the request bypassed it somehow; refuse it.
fn require_claims<T>(request: &tonic::Request<T>) -> Result<UserClaims, tonic::Status> {
    request
        .extensions()
        .get::<UserClaims>()
        .cloned()
        .ok_or_else(|| tonic::Status::unauthenticated("authentication required"))
}

fn unimplemented_response() -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert(
        tonic::Status::GRPC_STATUS,
        (tonic::Code::Unimplemented as i32).into(),
    );
    headers.insert(http::header::CONTENT_TYPE, tonic::metadata::GRPC_CONTENT_TYPE);
    response
}

// =============================================================================
// AuthService
// =============================================================================

#[derive(Clone)]
pub struct AuthGrpc {
    inner: Arc<AuthService>,
}

impl AuthGrpc {
    #[must_use]
    pub fn new(inner: Arc<AuthService>) -> Self {
        Self { inner }
    }
}

impl<B> tower::Service<http::Request<B>> for AuthGrpc
where
    B: http_body::Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            methods::AUTH_LOGIN => {
                struct LoginSvc(Arc<AuthService>);
                impl tonic::server::UnaryService<LoginRequest> for LoginSvc {
                    type Response = LoginResponse;
                    type Future = BoxFuture<tonic::Response<LoginResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<LoginRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let resp = inner.login(request.into_inner()).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(LoginSvc(inner), req).await)
                })
            }
            methods::AUTH_REFRESH_TOKEN => {
                struct RefreshSvc(Arc<AuthService>);
                impl tonic::server::UnaryService<RefreshTokenRequest> for RefreshSvc {
                    type Response = RefreshTokenResponse;
                    type Future = BoxFuture<tonic::Response<RefreshTokenResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<RefreshTokenRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let resp = inner.refresh_token(request.into_inner()).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(RefreshSvc(inner), req).await)
                })
            }
            methods::AUTH_VALIDATE_TOKEN => {
                struct ValidateSvc(Arc<AuthService>);
                impl tonic::server::UnaryService<ValidateTokenRequest> for ValidateSvc {
                    type Response = ValidateTokenResponse;
                    type Future = BoxFuture<tonic::Response<ValidateTokenResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<ValidateTokenRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            Ok(tonic::Response::new(
                                inner.validate_token(request.into_inner()),
                            ))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(ValidateSvc(inner), req).await)
                })
            }
            methods::AUTH_LOGOUT => {
                struct LogoutSvc(Arc<AuthService>);
                impl tonic::server::UnaryService<LogoutRequest> for LogoutSvc {
                    type Response = LogoutResponse;
                    type Future = BoxFuture<tonic::Response<LogoutResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<LogoutRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            require_claims(&request)?;
                            Ok(tonic::Response::new(inner.logout(request.into_inner())))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(LogoutSvc(inner), req).await)
                })
            }
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

impl NamedService for AuthGrpc {
    const NAME: &'static str = methods::AUTH_SERVICE;
}

// =============================================================================
// UserService
// =============================================================================

#[derive(Clone)]
pub struct UserGrpc {
    inner: Arc<UserService>,
}

impl UserGrpc {
    #[must_use]
    pub fn new(inner: Arc<UserService>) -> Self {
        Self { inner }
    }
}

impl<B> tower::Service<http::Request<B>> for UserGrpc
where
    B: http_body::Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            methods::USER_REGISTER => {
                struct RegisterSvc(Arc<UserService>);
                impl tonic::server::UnaryService<RegisterUserRequest> for RegisterSvc {
                    type Response = RegisterUserResponse;
                    type Future = BoxFuture<tonic::Response<RegisterUserResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<RegisterUserRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let resp = inner.register(request.into_inner()).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(RegisterSvc(inner), req).await)
                })
            }
            methods::USER_GET_PROFILE => {
                struct GetProfileSvc(Arc<UserService>);
                impl tonic::server::UnaryService<GetUserProfileRequest> for GetProfileSvc {
                    type Response = GetUserProfileResponse;
                    type Future = BoxFuture<tonic::Response<GetUserProfileResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<GetUserProfileRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let claims = require_claims(&request)?;
                            let resp = inner.get_profile(&claims).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(GetProfileSvc(inner), req).await)
                })
            }
            methods::USER_UPDATE_PROFILE => {
                struct UpdateProfileSvc(Arc<UserService>);
                impl tonic::server::UnaryService<UpdateUserProfileRequest> for UpdateProfileSvc {
                    type Response = UpdateUserProfileResponse;
                    type Future =
                        BoxFuture<tonic::Response<UpdateUserProfileResponse>, tonic::Status>;
                    fn call(
                        &mut self,
                        request: tonic::Request<UpdateUserProfileRequest>,
                    ) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let claims = require_claims(&request)?;
                            let resp = inner.update_profile(&claims, request.into_inner()).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(UpdateProfileSvc(inner), req).await)
                })
            }
            methods::USER_CHANGE_PASSWORD => {
                struct ChangePasswordSvc(Arc<UserService>);
                impl tonic::server::UnaryService<ChangePasswordRequest> for ChangePasswordSvc {
                    type Response = ChangePasswordResponse;
                    type Future = BoxFuture<tonic::Response<ChangePasswordResponse>, tonic::Status>;
                    fn call(&mut self, request: tonic::Request<ChangePasswordRequest>) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let claims = require_claims(&request)?;
                            let resp = inner.change_password(&claims, request.into_inner()).await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(ChangePasswordSvc(inner), req).await)
                })
            }
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

impl NamedService for UserGrpc {
    const NAME: &'static str = methods::USER_SERVICE;
}

// =============================================================================
// InstanceService
// =============================================================================

#[derive(Clone)]
pub struct InstanceGrpc {
    inner: Arc<InstanceService>,
}

impl InstanceGrpc {
    #[must_use]
    pub fn new(inner: Arc<InstanceService>) -> Self {
        Self { inner }
    }
}

impl<B> tower::Service<http::Request<B>> for InstanceGrpc
where
    B: http_body::Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            methods::INSTANCE_GET_PROFILE => {
                struct GetProfileSvc(Arc<InstanceService>);
                impl tonic::server::UnaryService<GetInstanceProfileRequest> for GetProfileSvc {
                    type Response = InstanceProfile;
                    type Future = BoxFuture<tonic::Response<InstanceProfile>, tonic::Status>;
                    fn call(
                        &mut self,
                        _request: tonic::Request<GetInstanceProfileRequest>,
                    ) -> Self::Future {
                        let inner = self.0.clone();
                        Box::pin(async move {
                            let resp = inner.get_profile().await?;
                            Ok(tonic::Response::new(resp))
                        })
                    }
                }
                let inner = self.inner.clone();
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(GetProfileSvc(inner), req).await)
                })
            }
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

impl NamedService for InstanceGrpc {
    const NAME: &'static str = methods::INSTANCE_SERVICE;
}
