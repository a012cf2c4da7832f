//! Environment variable loading utilities
//!
//! Values that are present but malformed are reported as [`ConfigError::InvalidValue`]
//! rather than silently replaced by the default, so a typo fails startup.

use crate::config::ConfigError;
use std::env;
use std::str::FromStr;

/// Builder for loading multiple environment variables with consistent prefix
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    fn raw(&self, suffix: &str) -> Option<(String, String)> {
        let key = self.key(suffix);
        env::var(&key).ok().map(|value| (key, value))
    }

    /// Load a string value with default
    pub fn load_string(&self, suffix: &str, default: &str) -> String {
        self.raw(suffix)
            .map(|(_, v)| v)
            .unwrap_or_else(|| default.to_string())
    }

    /// Load an optional string value
    pub fn load_optional_string(&self, suffix: &str) -> Option<String> {
        self.raw(suffix).map(|(_, v)| v)
    }

    /// Load a parsed value with default, failing when the variable is malformed
    pub fn load_parsed<T>(&self, suffix: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
    {
        match self.raw(suffix) {
            None => Ok(default),
            Some((key, value)) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: key,
                value,
                hint: format!("Expected a value of type {}", std::any::type_name::<T>()),
            }),
        }
    }

    /// Load a boolean accepting true/false, 1/0, yes/no, on/off
    pub fn load_bool(&self, suffix: &str, default: bool) -> Result<bool, ConfigError> {
        match self.raw(suffix) {
            None => Ok(default),
            Some((key, value)) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    field: key,
                    value,
                    hint: "Expected true/false, 1/0, yes/no or on/off".to_string(),
                }),
            },
        }
    }

    /// Load a comma-separated list, trimming entries and dropping empty ones
    pub fn load_list(&self, suffix: &str) -> Option<Vec<String>> {
        self.raw(suffix).map(|(_, value)| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}
