//! Configuration for the schema resolver
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemas.toml)
//! - Environment variables (SCHEMAS__*)
//!
//! ## Example config file (schemas.toml):
//! ```toml
//! [registry]
//! include_embedded = true
//! schema_dirs = ["./extra-schemas"]
//! default_version = "v1"
//!
//! [validation]
//! draft = "draft4"
//! max_reported_errors = 10
//!
//! [logging]
//! filter = "api_schemas=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Where schema definitions come from
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Validator settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Log filter used by the binaries
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Register the schema bundle compiled into the crate
    #[serde(default = "default_true")]
    pub include_embedded: bool,

    /// Extra directories of definition files, registered after the bundle
    #[serde(default)]
    pub schema_dirs: Vec<PathBuf>,

    /// Version used when a caller does not name one
    #[serde(default)]
    pub default_version: Option<String>,
}

/// JSON Schema draft used to compile every operation schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDraft {
    #[default]
    Draft4,
    Draft6,
    Draft7,
}

impl SchemaDraft {
    pub fn as_jsonschema(self) -> jsonschema::Draft {
        match self {
            SchemaDraft::Draft4 => jsonschema::Draft::Draft4,
            SchemaDraft::Draft6 => jsonschema::Draft::Draft6,
            SchemaDraft::Draft7 => jsonschema::Draft::Draft7,
        }
    }
}

/// Validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub draft: SchemaDraft,

    /// Upper bound on failures collected for one payload
    #[serde(default = "default_max_reported_errors")]
    pub max_reported_errors: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_max_reported_errors() -> usize {
    10
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            include_embedded: true,
            schema_dirs: Vec::new(),
            default_version: None,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            draft: SchemaDraft::default(),
            max_reported_errors: default_max_reported_errors(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["schemas.toml", ".schemas.toml", "config/schemas.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "api-schemas", "schemas") {
            let xdg_config = config_dir.config_dir().join("schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SCHEMAS__REGISTRY__DEFAULT_VERSION=v2
        builder = builder.add_source(
            Environment::with_prefix("SCHEMAS")
                .prefix_separator("__")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchemaConfig::default();
        assert!(config.registry.include_embedded);
        assert!(config.registry.schema_dirs.is_empty());
        assert_eq!(config.validation.draft, SchemaDraft::Draft4);
        assert_eq!(config.validation.max_reported_errors, 10);
    }

    #[test]
    fn test_serialize_config() {
        let config = SchemaConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("draft = \"draft4\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\ninclude_embedded = false\ndefault_version = \"v2\"\n\n[validation]\ndraft = \"draft7\"\n",
        )
        .unwrap();

        let config = SchemaConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(!config.registry.include_embedded);
        assert_eq!(config.registry.default_version.as_deref(), Some("v2"));
        assert_eq!(config.validation.draft, SchemaDraft::Draft7);
        assert_eq!(config.validation.max_reported_errors, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(SchemaConfig::load_from(Some("/nonexistent/schemas-config.toml")).is_err());
    }
}
