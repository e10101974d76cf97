//! Tracing initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: an `EnvFilter` (RUST_LOG wins over the
/// configured level) plus a fmt layer. Later calls are no-ops.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
