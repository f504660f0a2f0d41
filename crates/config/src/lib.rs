#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for lockyard
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/lockyard/config.toml)
//! - Environment variables
//! - CLI flags

use lockyard_errors::{ConfigError, Error};
use lockyard_types::{OutputFormat, QueuePrecedence, Resource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub locks: LockConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    /// Resources created on startup when missing from the registry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceSeed>,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Lock arbitration behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Rank capability candidates by contention before assignment
    #[serde(default = "default_fair_selection")]
    pub fair_selection: bool,
    /// Policy used when a release wakes queued requests
    #[serde(default)]
    pub queue_precedence: QueuePrecedence,
    /// Create unknown named resources on first reference
    #[serde(default)]
    pub auto_create_resources: bool,
}

/// Registry persistence
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistryConfig {
    pub path: Option<PathBuf>,
}

/// A resource definition seeded from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSeed {
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceSeed {
    /// Build the registry resource for this seed
    #[must_use]
    pub fn to_resource(&self) -> Resource {
        let caps = self
            .capabilities
            .iter()
            .flat_map(|c| Resource::parse_capabilities(c));
        let resource = Resource::new(self.name.trim()).with_capabilities(caps);
        match &self.description {
            Some(description) => resource.with_description(description.clone()),
            None => resource,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            fair_selection: false,
            queue_precedence: QueuePrecedence::OldestFirst,
            auto_create_resources: false,
        }
    }
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_fair_selection() -> bool {
    false
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("lockyard").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load the default config file, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        Self::load_or_default(None).await
    }

    /// Load configuration from `path` (or the default path) if it exists,
    /// otherwise use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write configuration as TOML, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized
    /// or if the file cannot be written.
    pub async fn save_to_file(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
                error: e.to_string(),
            })?;

        let content = format!("# lockyard configuration\n\n{toml_string}");

        fs::write(path, content)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(fair) = std::env::var("LOCKYARD_FAIR_SELECTION") {
            self.locks.fair_selection = parse_bool("LOCKYARD_FAIR_SELECTION", fair)?;
        }

        if let Ok(precedence) = std::env::var("LOCKYARD_QUEUE_PRECEDENCE") {
            self.locks.queue_precedence =
                precedence
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "LOCKYARD_QUEUE_PRECEDENCE".to_string(),
                        value: precedence,
                    })?;
        }

        if let Ok(auto_create) = std::env::var("LOCKYARD_AUTO_CREATE") {
            self.locks.auto_create_resources = parse_bool("LOCKYARD_AUTO_CREATE", auto_create)?;
        }

        if let Ok(path) = std::env::var("LOCKYARD_REGISTRY_PATH") {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "LOCKYARD_REGISTRY_PATH".to_string(),
                    value: path,
                }
                .into());
            }
            self.registry.path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Reject seeds that cannot become registry entries
    ///
    /// # Errors
    ///
    /// Returns an error for blank or duplicated seed names.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = std::collections::BTreeSet::new();
        for seed in &self.resources {
            let name = seed.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid {
                    message: "resource seed with empty name".to_string(),
                }
                .into());
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid {
                    message: format!("resource '{name}' defined twice"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get the registry path (with default)
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.registry.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lockyard")
                .join("resources.json")
        })
    }
}
