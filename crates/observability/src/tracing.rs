//! Subscriber installation for structured JSON logs.

use tracing_subscriber::EnvFilter;

/// Install the process subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Calling this more than once is harmless; only the first installation
/// takes effect.
pub fn init() {
    init_with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
}

/// Install the process subscriber with an explicit filter. Tests pin their
/// own levels through this.
pub fn init_with_filter(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(true)
        .with_target(false)
        .try_init();
}
