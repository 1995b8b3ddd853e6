//! Tracing/logging initialization.
//!
//! JSON output so order lifecycle events (placements, cancellations,
//! conflict retries) land in log pipelines as structured records.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process at the default `info` level.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default("info");
}

/// Initialize tracing/logging with an explicit fallback filter, applied
/// when `RUST_LOG` is unset.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
