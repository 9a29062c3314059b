use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter when `RUST_LOG` is unset. Kept at `warn` so a healthy run
/// prints nothing beyond the bootstrap events.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Install the global subscriber: JSON lines on stderr, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(false)
        .with_target(true)
        .with_writer(std::io::stderr);

    // `try_init` so tests that install their own subscriber do not panic.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
