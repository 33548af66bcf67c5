//! Database credential loading for nova-pg
//!
//! Credentials live in a configuration file keyed by environment name
//! (`dev`, `prod`, ...). Each section describes one PostgreSQL target:
//!
//! ```json
//! {
//!   "dev": {
//!     "host": "localhost",
//!     "port": 5432,
//!     "database": "nq",
//!     "user": "u",
//!     "password": "p",
//!     "sslmode": "require"
//!   }
//! }
//! ```
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. The selected file section
//! 3. Optional `NOVA_PG_DB_*` environment variable overrides
//! 4. Validation before a connection string is produced

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigErrorKind, ConfigResult};
pub use source::{ConfigFile, ConfigFormat};

use nova_pg_common::REDACTED;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::collections::BTreeMap;
use std::path::Path;
use validation::{MissingFields, Validate};

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

/// Environment section used when the caller does not name one
pub const DEFAULT_ENV_NAME: &str = "dev";

/// URL scheme understood by libpq-compatible drivers
pub const CONNECTION_SCHEME: &str = "postgresql";

// Environment variable overrides
const ENV_DB_HOST: &str = "NOVA_PG_DB_HOST";
const ENV_DB_PORT: &str = "NOVA_PG_DB_PORT";
const ENV_DB_NAME: &str = "NOVA_PG_DB_NAME";
const ENV_DB_USER: &str = "NOVA_PG_DB_USER";
const ENV_DB_PASSWORD: &str = "NOVA_PG_DB_PASSWORD";
const ENV_DB_SSL_MODE: &str = "NOVA_PG_DB_SSLMODE";

/// Required keys of a credential section and the aliases each accepts
const REQUIRED_KEYS: &[(&str, &[&str])] = &[
    ("host", &["host"]),
    ("port", &["port"]),
    ("database", &["database", "dbname"]),
    ("user", &["user", "username"]),
    ("password", &["password"]),
];

/// Accepted spellings of the optional ssl mode key
const SSL_MODE_KEYS: &[&str] = &["sslmode", "ssl_mode"];

/// SSL negotiation mode, spelled the way libpq spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "allow" => Ok(Self::Allow),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            "verify-ca" | "verify_ca" => Ok(Self::VerifyCa),
            "verify-full" | "verify_full" => Ok(Self::VerifyFull),
            _ => Err(ConfigError::invalid(
                "sslmode",
                format!("unknown ssl mode '{s}'"),
            )),
        }
    }
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => Self::Disable,
            SslMode::Allow => Self::Allow,
            SslMode::Prefer => Self::Prefer,
            SslMode::Require => Self::Require,
            SslMode::VerifyCa => Self::VerifyCa,
            SslMode::VerifyFull => Self::VerifyFull,
        }
    }
}

/// Credentials for one PostgreSQL target
///
/// Loaded once per call chain and never cached. `Debug` output hides the password.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    /// Database host
    pub host: String,

    /// Database port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Username for authentication
    pub user: String,

    /// Password for authentication (may be empty for trust/peer auth)
    pub password: String,

    /// Optional SSL mode, appended as `sslmode=` when set
    pub ssl_mode: Option<SslMode>,

    /// Extra connection parameters, appended in key order
    pub options: BTreeMap<String, String>,
}

/// Port as written in a config file: `5432` or `"5432"`
#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

/// Credential text as written in a config file: `"1234"` or `1234`
#[derive(Deserialize)]
#[serde(untagged)]
enum TextValue {
    Text(String),
    Number(serde_json::Number),
}

impl TextValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Section shape before validation
#[derive(Deserialize)]
struct RawCredentials {
    host: TextValue,
    port: PortValue,
    #[serde(alias = "dbname")]
    database: TextValue,
    #[serde(alias = "username")]
    user: TextValue,
    password: TextValue,
    #[serde(default, alias = "ssl_mode")]
    sslmode: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, Value>,
}

impl DbCredentials {
    /// Build credentials with no SSL mode and no extra options
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            ssl_mode: None,
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = Some(ssl_mode);
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Parse one environment section of a configuration file
    ///
    /// # Errors
    /// - `ConfigError::MissingFields` if required keys are absent or blank
    /// - `ConfigError::Parse` if a value has the wrong type
    /// - `ConfigError::InvalidValue` for an out-of-range port, an unknown ssl mode,
    ///   or a key given under two of its aliases
    pub fn from_section(section: &Map<String, Value>, context: &str) -> ConfigResult<Self> {
        let missing = missing_keys(section);
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields {
                fields: missing.into_iter().map(String::from).collect(),
            });
        }
        check_alias_conflicts(section)?;

        let raw: RawCredentials = serde_json::from_value(Value::Object(section.clone()))
            .map_err(|e| ConfigError::parse(context, e))?;

        let port = match raw.port {
            PortValue::Number(port) => validation::validate_port(port, "port")?,
            PortValue::Text(text) => {
                let port = text.trim().parse::<u64>().map_err(|_| {
                    ConfigError::invalid("port", format!("'{text}' is not a port number"))
                })?;
                validation::validate_port(port, "port")?
            }
        };

        let ssl_mode = raw
            .sslmode
            .as_deref()
            .map(str::parse::<SslMode>)
            .transpose()?;

        let options = raw
            .options
            .into_iter()
            .map(|(key, value)| option_value(&key, value).map(|value| (key, value)))
            .collect::<ConfigResult<BTreeMap<_, _>>>()?;

        let credentials = Self {
            host: raw.host.into_string(),
            port,
            database: raw.database.into_string(),
            user: raw.user.into_string(),
            password: raw.password.into_string(),
            ssl_mode,
            options,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Overlay `NOVA_PG_DB_*` environment variables onto these credentials
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if an override cannot be parsed
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup` (keyed by `NOVA_PG_DB_*` names)
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if an override cannot be parsed
    pub fn with_overrides_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DB_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT) {
            let parsed = port.trim().parse::<u64>().map_err(|_| {
                ConfigError::invalid(ENV_DB_PORT, format!("'{port}' is not a port number"))
            })?;
            self.port = validation::validate_port(parsed, ENV_DB_PORT)?;
        }
        if let Some(database) = lookup(ENV_DB_NAME) {
            self.database = database;
        }
        if let Some(user) = lookup(ENV_DB_USER) {
            self.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.password = password;
        }
        if let Some(ssl_mode) = lookup(ENV_DB_SSL_MODE) {
            self.ssl_mode = Some(ssl_mode.parse()?);
        }
        Ok(self)
    }

    /// Build `PostgreSQL` connection options without going through a URL
    pub fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);

        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        if let Some(ssl_mode) = self.ssl_mode {
            options = options.ssl_mode(ssl_mode.into());
        }

        let mut runtime_params = Vec::new();
        for (key, value) in &self.options {
            if key == "application_name" {
                options = options.application_name(value);
            } else {
                runtime_params.push((key.as_str(), value.as_str()));
            }
        }
        if runtime_params.is_empty() {
            options
        } else {
            options.options(runtime_params)
        }
    }

    /// Get connection info for logging (NO PASSWORD!)
    pub fn safe_connection_string(&self) -> String {
        let ssl = self.ssl_mode.map_or("default", SslMode::as_str);
        format!(
            "{}@{}:{}/{} (ssl: {ssl})",
            self.user, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("ssl_mode", &self.ssl_mode)
            .field("options", &self.options)
            .finish()
    }
}

impl Validate for DbCredentials {
    fn validate(&self) -> ConfigResult<()> {
        MissingFields::new()
            .check_non_empty(&self.host, "host")
            .check_present(self.port != 0, "port")
            .check_non_empty(&self.database, "database")
            .check_non_empty(&self.user, "user")
            .finish()
    }
}

fn option_value(key: &str, value: Value) -> ConfigResult<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(ConfigError::invalid(
            &format!("options.{key}"),
            "expected a string, number or boolean",
        )),
    }
}

/// Reject keys spelled under more than one alias (`database` and `dbname`, ...)
fn check_alias_conflicts(section: &Map<String, Value>) -> ConfigResult<()> {
    let aliased = REQUIRED_KEYS
        .iter()
        .map(|(name, aliases)| (*name, *aliases))
        .chain(std::iter::once(("sslmode", SSL_MODE_KEYS)));

    for (name, aliases) in aliased {
        let present = aliases
            .iter()
            .filter(|alias| section.contains_key(**alias))
            .copied()
            .collect::<Vec<_>>();
        if present.len() > 1 {
            return Err(ConfigError::invalid(
                name,
                format!("set only one of {}", present.join(", ")),
            ));
        }
    }
    Ok(())
}

/// Required keys absent from `section`, by canonical name
///
/// A key counts as present under any of its aliases (`dbname` for `database`,
/// `username` for `user`) unless its value is `null`.
pub fn missing_keys(section: &Map<String, Value>) -> Vec<&'static str> {
    REQUIRED_KEYS
        .iter()
        .filter(|(_, aliases)| {
            !aliases
                .iter()
                .any(|alias| section.get(*alias).is_some_and(|value| !value.is_null()))
        })
        .map(|(name, _)| *name)
        .collect()
}

/// Load the credentials for `env_name` from the configuration file at `config_file_path`
///
/// # Errors
/// - `ConfigError::NotFound` if the file does not exist
/// - `ConfigError::EnvironmentNotFound` if the environment section is absent
/// - `ConfigError::Parse` if the file or section is malformed
/// - `ConfigError::MissingFields` / `ConfigError::InvalidValue` for bad credentials
pub fn load_db_config<P: AsRef<Path>>(
    config_file_path: P,
    env_name: &str,
) -> ConfigResult<DbCredentials> {
    let file = ConfigFile::load(config_file_path)?;
    let section = file.section(env_name)?;
    let context = format!("environment '{env_name}' in {}", file.path().display());
    let credentials = DbCredentials::from_section(section, &context)?;

    tracing::debug!(
        env = env_name,
        target = %credentials.safe_connection_string(),
        "Loaded database configuration"
    );
    Ok(credentials)
}

/// Load the credentials for the default environment ([`DEFAULT_ENV_NAME`])
///
/// # Errors
/// Same as [`load_db_config`]
pub fn load_db_config_default<P: AsRef<Path>>(config_file_path: P) -> ConfigResult<DbCredentials> {
    load_db_config(config_file_path, DEFAULT_ENV_NAME)
}

/// Format credentials as a `postgresql://` connection URL
///
/// `postgresql://<user>:<password>@<host>:<port>/<database>[?<param>=<value>&...]`
///
/// User, password, database and parameters are percent-encoded; `sslmode` comes first,
/// then extra options in key order, so the output is deterministic.
///
/// # Errors
/// Returns `ConfigError::MissingFields` if host, port, database or user is missing
pub fn build_connection_string(db_cred: &DbCredentials) -> ConfigResult<String> {
    db_cred.validate()?;

    let user = urlencoding::encode(&db_cred.user);
    let userinfo = if db_cred.password.is_empty() {
        user.into_owned()
    } else {
        format!("{user}:{}", urlencoding::encode(&db_cred.password))
    };

    let mut url = format!(
        "{CONNECTION_SCHEME}://{userinfo}@{}:{}/{}",
        db_cred.host,
        db_cred.port,
        urlencoding::encode(&db_cred.database)
    );

    let params = db_cred
        .ssl_mode
        .map(|mode| ("sslmode".to_string(), mode.as_str().to_string()))
        .into_iter()
        .chain(db_cred.options.iter().map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        }))
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>();

    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    Ok(url)
}
