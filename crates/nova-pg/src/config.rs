//! Database credentials and connection strings

use std::path::Path;
use tracing::debug;

pub use nova_pg_config::{
    CONNECTION_SCHEME, ConfigError, ConfigErrorKind, ConfigFile, ConfigFormat, ConfigResult,
    DEFAULT_ENV_NAME, DbCredentials, SslMode, build_connection_string, load_db_config,
    load_db_config_default, missing_keys,
};

/// Load one environment's credentials and render its connection string
///
/// # Errors
/// Any error from [`load_db_config`] or [`build_connection_string`]
pub fn connection_string_for_env<P: AsRef<Path>>(
    config_file_path: P,
    env_name: &str,
) -> ConfigResult<String> {
    let credentials = load_db_config(config_file_path, env_name)?;
    let url = build_connection_string(&credentials)?;
    debug!(
        env = env_name,
        target_db = %credentials.safe_connection_string(),
        "Built connection string"
    );
    Ok(url)
}
