//! The userhub server: one TCP port, three bindings.
//!
//! A single listener accepts every connection; the multiplexer sniffs the
//! HTTP/2 client preface and routes gRPC traffic to a tonic server and
//! everything else to an axum app carrying both the REST gateway and the
//! Connect-RPC binding. All three go through the same service layer and the
//! same authorization policy.

pub mod config;
pub mod connect;
pub mod gateway;
pub mod grpc;
pub mod middleware;
pub mod mux;
pub mod observability;
pub mod server;
pub mod service;

use std::sync::Arc;

use userhub_auth::Authenticator;
use userhub_store::Store;

use crate::service::{AuthService, InstanceService, UserService};

pub use config::Profile;
pub use server::{Server, ServerBuilder, router};

/// Shared handles threaded through every transport binding.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub authenticator: Arc<Authenticator>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub instance: Arc<InstanceService>,
    /// Demo deployments log panic payloads verbatim.
    pub demo: bool,
}
