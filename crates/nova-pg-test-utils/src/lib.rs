//! Shared test utilities for nova-pg integration tests
//!
//! Provides a persistent Tokio runtime, temporary configuration files and the
//! optional live database URL used by tests that talk to a real PostgreSQL.
//!
//! ## Usage
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! nova-pg-test-utils = { path = "../nova-pg-test-utils" }
//! ```
//!
//! In your tests:
//! ```no_run
//! #[test]
//! fn my_live_test() {
//!     let Some(url) = nova_pg_test_utils::test_database_url() else {
//!         return;
//!     };
//!     nova_pg_test_utils::get_test_runtime().block_on(async {
//!         // ... test logic against `url` ...
//!     });
//! }
//! ```

// Test infrastructure - panic on setup failure is acceptable
#![allow(clippy::expect_used)]

use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Environment variable naming a disposable database for live tests
pub const TEST_DATABASE_URL_ENV: &str = "NOVA_PG_TEST_DATABASE_URL";

/// Shared Tokio runtime for live database tests
///
/// Connections opened on one runtime must not outlive it, so every live test
/// runs on this single persistent runtime.
static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Global counter for unique object names (schemas, tables) across tests
static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Get the shared test runtime (creates on first call, reuses thereafter)
///
/// # Panics
/// Panics if the runtime cannot be created
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("nova-pg-test")
            .worker_threads(2)
            .build()
            .expect("Failed to create test runtime")
    })
}

/// Live database URL, or `None` when live tests should be skipped
pub fn test_database_url() -> Option<String> {
    std::env::var(TEST_DATABASE_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Unique, identifier-safe name with the given prefix
///
/// ```
/// let a = nova_pg_test_utils::unique_name("t");
/// let b = nova_pg_test_utils::unique_name("t");
/// assert_ne!(a, b);
/// ```
pub fn unique_name(prefix: &str) -> String {
    let counter = NAME_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{}_{counter}", std::process::id())
}

/// The single-environment configuration used throughout the test suite
pub fn reference_config() -> Value {
    json!({
        "dev": {
            "host": "localhost",
            "port": 5432,
            "database": "nq",
            "user": "u",
            "password": "p"
        }
    })
}

/// A configuration file written into its own temporary directory
///
/// The directory (and file) is removed when this value is dropped.
pub struct TempConfig {
    _dir: TempDir,
    path: PathBuf,
}

impl TempConfig {
    /// Serialize `value` as JSON into `file_name`
    ///
    /// # Panics
    /// Panics if the temporary directory or file cannot be written
    pub fn json(file_name: &str, value: &Value) -> Self {
        let body = serde_json::to_string_pretty(value).expect("serialize test config");
        Self::raw(file_name, &body)
    }

    /// Write `content` verbatim into `file_name` (for TOML, YAML or broken files)
    ///
    /// # Panics
    /// Panics if the temporary directory or file cannot be written
    pub fn raw(file_name: &str, content: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(file_name);
        std::fs::write(&path, content).expect("write test config");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}
