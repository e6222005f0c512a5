//! # Tracing subscriber installation.
//!
//! [`init_tracing`] installs a `fmt` subscriber once per process. The filter comes
//! from `RUST_LOG` when set, otherwise from the given default (usually `LOG_LEVEL`),
//! otherwise `info`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a tracing subscriber (if one is not already active).
///
/// Logs go to stderr so stdout stays free for JSON-lines output.
/// Calling this function multiple times is harmless.
pub fn init_tracing(default_level: Option<&str>) {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let _ = TRACING_INIT.set(());
}
