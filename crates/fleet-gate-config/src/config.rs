// crates/fleet-gate-config/src/config.rs
// ============================================================================
// Module: Fleet Gate Configuration
// Description: Configuration loading and validation for fleet-gate.toml.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: fleet-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown fields are rejected and no environment variables are consulted.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use fleet_gate_core::runtime::default_worker_count;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::source::PolicyLocation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "fleet-gate.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of review workers.
pub const MAX_WORKER_COUNT: usize = 1024;
/// Maximum number of policy locations.
pub const MAX_POLICY_PATHS: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for a Fleet Gate engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetGateConfig {
    /// Review engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Policy library locations.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Optional object-store settings for `s3://` locations.
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,
}

impl FleetGateConfig {
    /// Loads configuration from disk, defaulting to `fleet-gate.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), Path::to_path_buf);
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.policy.validate()?;
        if let Some(store) = &self.object_store {
            store.validate()?;
        }
        Ok(())
    }

    /// Returns the object-store settings, falling back to defaults.
    #[must_use]
    pub fn object_store_or_default(&self) -> ObjectStoreConfig {
        self.object_store.clone().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Engine Config
// ============================================================================

/// Review engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker thread count; defaults to the number of logical cores.
    #[serde(default)]
    pub worker_count: Option<usize>,
}

impl EngineConfig {
    /// Validates engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the worker count is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(count) = self.worker_count
            && !(1 ..= MAX_WORKER_COUNT).contains(&count)
        {
            return Err(ConfigError::Invalid(format!(
                "engine.worker_count must be between 1 and {MAX_WORKER_COUNT}"
            )));
        }
        Ok(())
    }

    /// Returns the effective worker count.
    #[must_use]
    pub fn worker_count(&self) -> NonZeroUsize {
        self.worker_count.and_then(NonZeroUsize::new).unwrap_or_else(default_worker_count)
    }
}

// ============================================================================
// SECTION: Policy Config
// ============================================================================

/// Policy library locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Locations holding template and constraint documents.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Optional location holding shared Rego library modules.
    #[serde(default)]
    pub library_path: Option<String>,
}

impl PolicyConfig {
    /// Validates policy locations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a location is missing or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.is_empty() {
            return Err(ConfigError::Invalid(
                "policy.paths must list at least one location".to_string(),
            ));
        }
        if self.paths.len() > MAX_POLICY_PATHS {
            return Err(ConfigError::Invalid(format!(
                "policy.paths exceeds {MAX_POLICY_PATHS} entries"
            )));
        }
        for (index, path) in self.paths.iter().enumerate() {
            let field = format!("policy.paths[{index}]");
            validate_path_string(&field, path)?;
            parse_location(&field, path)?;
        }
        if let Some(library_path) = &self.library_path {
            validate_path_string("policy.library_path", library_path)?;
            parse_location("policy.library_path", library_path)?;
        }
        Ok(())
    }

    /// Returns the parsed document locations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a location cannot be parsed.
    pub fn locations(&self) -> Result<Vec<PolicyLocation>, ConfigError> {
        self.paths
            .iter()
            .enumerate()
            .map(|(index, path)| parse_location(&format!("policy.paths[{index}]"), path))
            .collect()
    }

    /// Returns the parsed library location, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the location cannot be parsed.
    pub fn library_location(&self) -> Result<Option<PolicyLocation>, ConfigError> {
        self.library_path
            .as_deref()
            .map(|path| parse_location("policy.library_path", path))
            .transpose()
    }
}

// ============================================================================
// SECTION: Object Store Config
// ============================================================================

/// S3-compatible object-store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Optional region (defaults to the AWS resolution chain).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional object-store endpoint (S3-compatible).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing (S3-compatible).
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl ObjectStoreConfig {
    /// Validates object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Invalid("object_store.region must be non-empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "object_store.endpoint must include http:// or https://".to_string(),
                ));
            }
            if trimmed.starts_with("http://") && !self.allow_http {
                return Err(ConfigError::Invalid(
                    "object_store.endpoint uses http:// without allow_http".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the config file path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Parses a configured location, naming the field on failure.
fn parse_location(field: &str, value: &str) -> Result<PolicyLocation, ConfigError> {
    PolicyLocation::parse(value.trim()).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
