//! Credential validation helpers

use crate::{ConfigError, ConfigResult};

/// Trait for validating configuration values
pub trait Validate {
    /// Validate this configuration object
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Validate and narrow a port number
///
/// # Errors
/// Returns `ConfigError::InvalidValue` if the port is 0 or above 65535
pub fn validate_port(port: u64, field_name: &str) -> ConfigResult<u16> {
    match u16::try_from(port) {
        Ok(0) => Err(ConfigError::invalid(field_name, "port must be non-zero")),
        Ok(port) => Ok(port),
        Err(_) => Err(ConfigError::invalid(
            field_name,
            format!("{port} is out of range (expected 1-65535)"),
        )),
    }
}

/// Collects the names of required fields that are missing or blank
#[derive(Debug, Default)]
pub struct MissingFields(Vec<String>);

impl MissingFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field_name` when `value` is empty or whitespace-only
    pub fn check_non_empty(&mut self, value: &str, field_name: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.0.push(field_name.to_string());
        }
        self
    }

    /// Record `field_name` unconditionally when `present` is false
    pub fn check_present(&mut self, present: bool, field_name: &str) -> &mut Self {
        if !present {
            self.0.push(field_name.to_string());
        }
        self
    }

    /// # Errors
    /// Returns `ConfigError::MissingFields` listing every recorded field
    pub fn finish(&mut self) -> ConfigResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields {
                fields: std::mem::take(&mut self.0),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_bounds() {
        assert_eq!(validate_port(5432, "port").ok(), Some(5432));
        assert!(matches!(
            validate_port(0, "port"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            validate_port(70_000, "port"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_fields_collects_in_order() {
        let result = MissingFields::new()
            .check_non_empty("", "host")
            .check_non_empty("nq", "database")
            .check_present(false, "port")
            .check_non_empty("   ", "user")
            .finish();

        match result {
            Err(ConfigError::MissingFields { fields }) => {
                assert_eq!(fields, vec!["host", "port", "user"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_nothing_missing_is_ok() {
        assert!(MissingFields::new().check_non_empty("x", "host").finish().is_ok());
    }
}
