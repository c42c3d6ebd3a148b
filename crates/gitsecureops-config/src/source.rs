//! Configuration source loading and composition
//!
//! Sources are layered: each one receives the configuration produced by the
//! lower-priority sources and returns its own view of it.

use crate::validation::Validate;
use crate::{ApplicationConfig, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "GITSECUREOPS";

/// Trait for loading configuration from different sources
pub trait ConfigurationSource {
    /// Apply this source on top of `base`
    ///
    /// # Errors
    /// Returns configuration loading errors
    fn load(&self, base: ApplicationConfig) -> ConfigResult<ApplicationConfig>;

    /// Get the name of this configuration source
    fn name(&self) -> &str;

    /// Get the priority of this source (higher number = higher priority)
    fn priority(&self) -> u8;
}

/// Overlay `GITSECUREOPS_<SECTION>_<FIELD>` environment variables
pub struct EnvironmentSource;

impl EnvironmentSource {
    fn overlay(base: &ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let mut tree = serde_json::to_value(base).map_err(|e| ConfigError::Generic {
            message: format!("Failed to serialize configuration: {e}"),
        })?;

        if let Some(sections) = tree.as_object_mut() {
            for (section, fields) in sections.iter_mut() {
                let Some(fields) = fields.as_object_mut() else {
                    continue;
                };
                for (field, value) in fields.iter_mut() {
                    let key = format!(
                        "{ENV_PREFIX}_{}_{}",
                        section.to_uppercase(),
                        field.to_uppercase()
                    );
                    if let Ok(raw) = std::env::var(&key) {
                        *value = coerce(value, &raw, &key)?;
                    }
                }
            }
        }

        serde_json::from_value(tree).map_err(|e| ConfigError::Generic {
            message: format!("Invalid environment override: {e}"),
        })
    }
}

/// Parse `raw` into the JSON type already held by `current`
fn coerce(current: &serde_json::Value, raw: &str, key: &str) -> ConfigResult<serde_json::Value> {
    use serde_json::Value;

    let invalid = || ConfigError::Generic {
        message: format!("Cannot parse {key}={raw}"),
    };

    match current {
        Value::Bool(_) => raw.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        _ => Ok(Value::String(raw.to_string())),
    }
}

impl ConfigurationSource for EnvironmentSource {
    fn load(&self, base: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        Self::overlay(&base)
    }

    fn name(&self) -> &'static str {
        "environment"
    }

    fn priority(&self) -> u8 {
        100 // Environment variables override everything
    }
}

/// Load configuration from a TOML file
pub struct TomlFileSource {
    path: PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn load(&self, _base: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        // Missing sections and fields fall back to defaults via #[serde(default)]
        let config: ApplicationConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }

    fn priority(&self) -> u8 {
        50
    }
}

/// Load configuration from a YAML file
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for YamlFileSource {
    fn load(&self, _base: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        let config: ApplicationConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "yaml_file"
    }

    fn priority(&self) -> u8 {
        50
    }
}

/// Pick a file source from the path's extension
///
/// # Errors
/// Returns `ConfigError::UnsupportedFormat` for anything but `.toml`, `.yaml` and `.yml`
pub fn file_source<P: AsRef<Path>>(path: P) -> ConfigResult<Box<dyn ConfigurationSource>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("toml") => Ok(Box::new(TomlFileSource::new(path))),
        Some("yaml" | "yml") => Ok(Box::new(YamlFileSource::new(path))),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Type alias for configuration sources
type ConfigSources = Vec<Box<dyn ConfigurationSource>>;

/// Configuration loader that combines multiple sources
pub struct ConfigurationLoader {
    sources: ConfigSources,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Load configuration from all sources with priority ordering
    ///
    /// A file that cannot be read or parsed is an error; silently running
    /// with defaults would point the service at the wrong upstream.
    ///
    /// # Errors
    /// Returns configuration loading or validation errors
    pub fn load(&self) -> ConfigResult<ApplicationConfig> {
        let mut config = ApplicationConfig::default();

        // Lowest priority first so higher priorities layer on top
        let mut sorted_sources = self.sources.iter().collect::<Vec<_>>();
        sorted_sources.sort_by_key(|source| source.priority());

        for source in sorted_sources {
            config = source.load(config)?;
            tracing::debug!("Loaded configuration from source: {}", source.name());
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}
