//! Logging bootstrap

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber
///
/// `RUST_LOG` overrides `default_filter` (e.g. `"retrodict=info"`). Returns
/// false when a global subscriber was already installed; calling it again
/// is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
