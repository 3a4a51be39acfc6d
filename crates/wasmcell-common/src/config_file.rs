//! Configuration file loading for the wasmcell host.
//!
//! A [`ConfigFile`] is the on-disk TOML form of a [`HostConfig`], plus
//! optional dynamic modules to register at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::HostConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [host.engine]
/// pooling_allocator = true
/// max_instances = 1000
///
/// [host.execution]
/// max_fuel = 10_000_000
/// timeout_ms = 1000
///
/// [[modules]]
/// name = "regex"
/// path = "./modules/regex.wasm"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Host configuration (engine + execution settings).
    #[serde(default)]
    pub host: HostConfig,

    /// Modules to register at startup.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// A dynamic module to register at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleEntry {
    /// Name to register the module under.
    pub name: String,

    /// Path to the WebAssembly module file.
    pub path: String,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert!(config.host.engine.pooling_allocator);
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [host.execution]
            timeout_ms = 50
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.host.execution.timeout_ms, 50);
        // Defaults applied
        assert_eq!(config.host.execution.max_fuel, 10_000_000);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [host.engine]
            pooling_allocator = false
            max_instances = 500

            [host.execution]
            max_fuel = 5_000_000
            timeout_ms = 50

            [[modules]]
            name = "regex"
            path = "./regex.wasm"

            [[modules]]
            name = "echo"
            path = "./echo.wasm"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert!(!config.host.engine.pooling_allocator);
        assert_eq!(config.host.engine.max_instances, 500);
        assert_eq!(config.host.execution.max_fuel, 5_000_000);
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].name, "regex");
        assert_eq!(config.modules[1].path, "./echo.wasm");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid = "this is not valid toml [";
        let result = ConfigFile::from_toml(invalid);
        assert!(result.is_err());
    }
}
