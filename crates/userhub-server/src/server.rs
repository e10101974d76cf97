//! Server assembly and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use userhub_auth::{Authenticator, TokenService};
use userhub_store::{Driver, MemoryDriver, Store};

use crate::AppState;
use crate::config::{DEFAULT_SECRET, Profile};
use crate::connect;
use crate::gateway;
use crate::grpc::{AuthGrpc, InstanceGrpc, UserGrpc};
use crate::middleware::{self, AuthLayer, GrpcPanicResponder, PanicResponder};
use crate::mux::{ConnectionMux, QueueListener};
use crate::service::{AuthService, InstanceService, UserService};

const CONNECTION_BACKLOG: usize = 1024;
const HTTP_GRACE: Duration = Duration::from_secs(10);

/// The full HTTP-side application: gateway + Connect routes behind the
/// shared middleware stack. Order matters: auth sits innermost, panic
/// recovery and tracing wrap everything, CORS is outermost.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(gateway::routes())
        .merge(connect::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(CatchPanicLayer::custom(PanicResponder { verbose: state.demo }))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::metadata))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct ServerBuilder {
    profile: Profile,
}

impl ServerBuilder {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub async fn build(self) -> anyhow::Result<Server> {
        self.profile.validate()?;
        if self.profile.secret == DEFAULT_SECRET {
            tracing::warn!("using the built-in token secret; set USERHUB_SECRET in production");
        }

        let driver: Arc<dyn Driver> = match self.profile.driver.as_str() {
            "memory" => Arc::new(MemoryDriver::new()),
            other => anyhow::bail!("unknown storage driver: {other}"),
        };
        let store = Arc::new(Store::new(driver));
        store.ping().await?;

        let tokens = TokenService::new(self.profile.secret.clone()).with_access_ttl(
            time::Duration::seconds(i64::from(self.profile.access_token_ttl_secs)),
        );
        let authenticator = Arc::new(Authenticator::new(tokens));
        let refresh_ttl = time::Duration::seconds(i64::from(self.profile.refresh_token_ttl_secs));

        let state = AppState {
            auth: Arc::new(AuthService::new(
                store.clone(),
                authenticator.clone(),
                refresh_ttl,
            )),
            users: Arc::new(UserService::new(store.clone())),
            instance: Arc::new(InstanceService::new(
                store.clone(),
                env!("CARGO_PKG_VERSION").to_string(),
                self.profile.demo,
            )),
            authenticator,
            store,
            demo: self.profile.demo,
        };

        Ok(Server {
            state,
            profile: self.profile,
            shutdown: CancellationToken::new(),
        })
    }
}

pub struct Server {
    state: AppState,
    profile: Profile,
    shutdown: CancellationToken,
}

impl Server {
    /// Token that stops the server when cancelled; useful for embedding.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Binds the shared port and serves until a shutdown signal arrives.
    ///
    /// Teardown order: stop accepting, drain gRPC, give HTTP a fixed grace
    /// period, then close the store. Repeated signals are harmless.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.profile.listen_addr()?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, demo = self.profile.demo, "listening");

        let (http_tx, http_rx) = mpsc::channel(CONNECTION_BACKLOG);
        let (grpc_tx, grpc_rx) = mpsc::channel(CONNECTION_BACKLOG);
        let mux = ConnectionMux::new(listener, http_tx, grpc_tx, self.shutdown.clone());
        let mux_handle = tokio::spawn(mux.run());

        let app = router(self.state.clone());
        let http_shutdown = self.shutdown.clone();
        let http_handle = tokio::spawn(async move {
            axum::serve(QueueListener::new(http_rx, local_addr), app)
                .with_graceful_shutdown(http_shutdown.cancelled_owned())
                .await
        });

        let grpc_shutdown = self.shutdown.clone();
        // Same shape as the HTTP stack: tracing and panic recovery wrap the
        // binding, auth sits innermost.
        let grpc_middleware = tower::ServiceBuilder::new()
            .layer(TraceLayer::new_for_grpc())
            .layer(CatchPanicLayer::custom(GrpcPanicResponder {
                verbose: self.state.demo,
            }))
            .layer(AuthLayer::new(self.state.authenticator.clone()))
            .into_inner();
        let grpc_server = tonic::transport::Server::builder()
            .layer(grpc_middleware)
            .add_service(AuthGrpc::new(self.state.auth.clone()))
            .add_service(UserGrpc::new(self.state.users.clone()))
            .add_service(InstanceGrpc::new(self.state.instance.clone()));
        let grpc_handle = tokio::spawn(async move {
            grpc_server
                .serve_with_incoming_shutdown(
                    ReceiverStream::new(grpc_rx),
                    grpc_shutdown.cancelled_owned(),
                )
                .await
        });

        let mut http_handle = http_handle;
        let mut grpc_handle = grpc_handle;
        let mut http_done = false;
        let mut grpc_done = false;
        // A sub-server failing after startup is logged and its sibling keeps
        // serving; only a signal (or the token) starts the teardown.
        loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                joined = &mut grpc_handle, if !grpc_done => {
                    grpc_done = true;
                    log_server_exit("grpc", joined);
                }
                joined = &mut http_handle, if !http_done => {
                    http_done = true;
                    log_server_exit("http", joined);
                }
            }
        }
        self.shutdown.cancel();

        // gRPC drains its in-flight RPCs first.
        if !grpc_done {
            log_server_join("grpc", grpc_handle.await);
        }
        if !http_done {
            match tokio::time::timeout(HTTP_GRACE, &mut http_handle).await {
                Ok(joined) => log_server_join("http", joined),
                Err(_) => {
                    tracing::warn!("http server did not drain in time, aborting");
                    http_handle.abort();
                }
            }
        }
        mux_handle.await?;
        self.state.store.close().await?;
        tracing::info!("shutdown complete");
        Ok(())
    }
}

fn log_server_exit<E: std::fmt::Display>(
    name: &'static str,
    joined: Result<Result<(), E>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(())) => tracing::warn!(server = name, "sub-server exited early"),
        Ok(Err(e)) => {
            tracing::error!(server = name, error = %e, "sub-server failed, sibling keeps serving");
        }
        Err(e) => {
            tracing::error!(server = name, error = %e, "sub-server task panicked, sibling keeps serving");
        }
    }
}

fn log_server_join<E: std::fmt::Display>(
    name: &'static str,
    joined: Result<Result<(), E>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(server = name, error = %e, "sub-server error during shutdown"),
        Err(e) => tracing::error!(server = name, error = %e, "sub-server task panicked"),
    }
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
