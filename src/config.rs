//! Configuration management for the resource registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (resources.toml)
//! - Environment variables (RESOURCES__*)
//!
//! ## Example config file (resources.toml):
//! ```toml
//! [registry]
//! anonymous_type_length = 16
//!
//! [normalizer]
//! collect_warnings = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Normalizer settings
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Length of generated anonymous store type names
    #[serde(default = "default_anonymous_type_length")]
    pub anonymous_type_length: usize,
}

/// Normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Keep non-fatal findings for reporting, on top of logging them
    #[serde(default = "default_true")]
    pub collect_warnings: bool,
}

fn default_anonymous_type_length() -> usize {
    12
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            anonymous_type_length: default_anonymous_type_length(),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            collect_warnings: true,
        }
    }
}

impl ResourcesConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "resources.toml",
            ".resources.toml",
            "config/resources.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "resources") {
            let xdg_config = config_dir.config_dir().join("resources.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RESOURCES")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
