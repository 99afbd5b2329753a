//! Logging setup for the server binary

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug,hyper=info,tower=info"
    } else {
        "info"
    }
}

/// Initialize the fmt subscriber.
///
/// `RUST_LOG` takes priority; otherwise the level follows `--debug`. Calling this
/// more than once is harmless.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::debug!("Logging initialized");
    }
}
