//! Configuration file loading
//!
//! A configuration file is a mapping of environment name to credential section.
//! JSON, TOML and YAML are accepted; all three are normalised into the same
//! `serde_json` section map so the credential parser only deals with one shape.

use crate::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from the file extension (JSON when unknown)
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => Self::Toml,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    /// Parse raw file content into a generic value tree
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the content is malformed for this format
    pub fn parse(self, content: &str, context: &str) -> ConfigResult<Value> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| ConfigError::parse(context, e)),
            Self::Toml => toml::from_str(content).map_err(|e| ConfigError::parse(context, e)),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::parse(context, e)),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Yaml => "yaml",
        };
        write!(f, "{name}")
    }
}

/// A parsed configuration file: environment name -> section
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    format: ConfigFormat,
    environments: Map<String, Value>,
}

impl ConfigFile {
    /// Read and parse the file at `path`
    ///
    /// # Errors
    /// - `ConfigError::NotFound` if the file does not exist
    /// - `ConfigError::Io` for other read failures
    /// - `ConfigError::Parse` if the content is malformed or not a mapping
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound { path: path.clone() }
            } else {
                ConfigError::Io(e)
            }
        })?;

        let format = ConfigFormat::from_path(&path);
        let context = path.display().to_string();
        let environments = match format.parse(&content, &context)? {
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::parse(
                    context,
                    format!(
                        "top level must map environment names to sections, found {}",
                        value_kind(&other)
                    ),
                ));
            }
        };

        tracing::debug!(
            path = %path.display(),
            %format,
            environments = environments.len(),
            "Parsed configuration file"
        );

        Ok(Self {
            path,
            format,
            environments,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Environment names present in the file, sorted by name
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    /// Look up the section for `env_name`
    ///
    /// A `null` or empty section counts as absent.
    ///
    /// # Errors
    /// - `ConfigError::EnvironmentNotFound` if the section is absent or empty
    /// - `ConfigError::Parse` if the section is not a mapping
    pub fn section(&self, env_name: &str) -> ConfigResult<&Map<String, Value>> {
        let not_found = || ConfigError::EnvironmentNotFound {
            env: env_name.to_string(),
            path: self.path.clone(),
        };

        match self.environments.get(env_name) {
            None | Some(Value::Null) => Err(not_found()),
            Some(Value::Object(section)) if section.is_empty() => Err(not_found()),
            Some(Value::Object(section)) => Ok(section),
            Some(other) => Err(ConfigError::parse(
                format!("environment '{env_name}' in {}", self.path.display()),
                format!("expected a mapping, found {}", value_kind(other)),
            )),
        }
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
