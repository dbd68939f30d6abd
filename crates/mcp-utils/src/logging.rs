//! Logging and tracing utilities
//!
//! Output always goes to stderr. Stdio tool servers use stdout as their
//! protocol channel, so nothing else may write there.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with default configuration
///
/// The filter comes from `RUST_LOG`, falling back to `info`.
pub fn init_tracing() {
    init_tracing_with_filter("info");
}

/// Initialize tracing subscriber, falling back to `default_filter` when
/// `RUST_LOG` is unset or invalid
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing_with_filter(default_filter: &str) {
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
