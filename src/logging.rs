// Tracing subscriber setup for embedding applications

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. The `RUST_LOG` environment
/// variable overrides the default filter; calling twice is a no-op so tests
/// and embedders cannot trip over each other.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
