//! Common utilities shared across nova-pg crates
//!
//! Process initialization (`.env`, tracing) and log-safe rendering of secrets.

pub mod init;
pub mod redact;

pub use init::{init_tracing, initialize_environment};
pub use redact::{REDACTED, redact_connection_string};
