//! Global initialization utilities for applications built on nova-pg

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static ENV_INIT: Once = Once::new();
static TRACING_INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize the process environment
///
/// Loads variables from a `.env` file in the current directory (or any parent)
/// so `NOVA_PG_DB_*` overrides can live outside the shell profile.
///
/// Safe to call multiple times - will only run once
pub fn initialize_environment() {
    ENV_INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`
///
/// Falls back to `info` when `RUST_LOG` is unset or invalid. Does nothing if this
/// function already ran or another global subscriber was installed first.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        // try_init: the host application may already own the global subscriber
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
