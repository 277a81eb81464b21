//! Configuration for a registry instance.
//!
//! Loaded from TOML (the default) or JSON files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;
use crate::events::{DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
use crate::id::Address;

/// Configuration for a registry and its event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub events: EventsSection,

    /// Log level for tracing, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// The registry's own address.
    #[serde(default)]
    pub address: Address,

    /// Principal made root at creation.
    #[serde(default)]
    pub deployer: Address,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventsSection {
    /// Maximum number of event records kept in memory.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(Address::ZERO, Address::ZERO)
    }
}

impl RegistryConfig {
    /// Create a config for a registry at `address` deployed by `deployer`.
    pub fn new(address: Address, deployer: Address) -> Self {
        Self {
            registry: RegistrySection { address, deployer },
            events: EventsSection::default(),
            log_level: default_log_level(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.address.is_zero() {
            return Err(ConfigError::Invalid(
                "registry.address must not be zero".to_string(),
            ));
        }
        if self.registry.deployer.is_zero() {
            return Err(ConfigError::Invalid(
                "registry.deployer must not be zero".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Invalid(
                "events.capacity must be at least 1".to_string(),
            ));
        }
        if self.events.capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "events.capacity must be at most {}",
                MAX_HISTORY_CAPACITY
            )));
        }
        Ok(())
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<RegistryConfig, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    debug!("Loading {} config from {:?}", ext, path);

    let content = std::fs::read_to_string(path)?;

    match ext {
        "toml" => Ok(toml::from_str(&content)?),
        "json" => Ok(serde_json::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TOML_CONFIG: &str = r#"
log_level = "debug"

[registry]
address = "0x00000000000000000000000000000000000000aa"
deployer = "0x00000000000000000000000000000000000000bb"

[events]
capacity = 16
"#;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.events.capacity, DEFAULT_HISTORY_CAPACITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("roles.toml");
        fs::write(&path, TOML_CONFIG).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.registry.address, Address::from_low_u64(0xaa));
        assert_eq!(config.registry.deployer, Address::from_low_u64(0xbb));
        assert_eq!(config.events.capacity, 16);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_json_with_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("roles.json");
        fs::write(
            &path,
            r#"{"registry": {"address": "0x00000000000000000000000000000000000000aa",
                             "deployer": "0x00000000000000000000000000000000000000bb"}}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.events.capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(
            config,
            RegistryConfig::new(Address::from_low_u64(0xaa), Address::from_low_u64(0xbb))
        );
    }

    #[test]
    fn test_unsupported_format() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("roles.yaml");
        fs::write(&path, "log_level: info").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_invalid_values() {
        let mut config =
            RegistryConfig::new(Address::from_low_u64(0xaa), Address::from_low_u64(0xbb));
        config.validate().unwrap();

        config.events.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.events.capacity = 1;
        config.registry.deployer = Address::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_capacity_upper_bound() {
        let mut config =
            RegistryConfig::new(Address::from_low_u64(0xaa), Address::from_low_u64(0xbb));

        config.events.capacity = MAX_HISTORY_CAPACITY;
        config.validate().unwrap();

        config.events.capacity = usize::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        // Building from an unchecked config still does not panic
        let registry = crate::RoleRegistry::from_config(&config);
        assert_eq!(registry.address(), Address::from_low_u64(0xaa));
    }

    #[test]
    fn test_bad_address_is_parse_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("roles.toml");
        fs::write(&path, "[registry]\naddress = \"0x12\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }
}
