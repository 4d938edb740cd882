#![forbid(unsafe_code)]

//! Configuration for card grids.
//!
//! [`CardGridConfig`] gathers every tunable of a card instance into one
//! struct that can be loaded from TOML or JSON at startup.
//!
//! ```toml
//! # cardgrid.toml
//! stagger_increment_ms = 40
//! resize_quiet_ms = 100
//!
//! [grid]
//! min_column_width = 260.0
//! max_columns = 4
//! gap = 12.0
//! ```
//!
//! ```rust,ignore
//! let config = CardGridConfig::from_toml_file("cardgrid.toml")?;
//! let config = CardGridConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Every field has a default, so a partial file only overrides what it names
//! and `CardGridConfig::default()` is a working configuration.

use std::path::Path;
use std::time::Duration;

use cardgrid_layout::GridMetrics;
use serde::{Deserialize, Serialize};

/// Tunables for one card instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardGridConfig {
    /// Masonry grid sizing.
    pub grid: GridMetrics,
    /// Delay between successive entrances of one stagger group.
    pub stagger_increment_ms: u64,
    /// Quiet window before a container resize is applied.
    pub resize_quiet_ms: u64,
    /// Container width assumed until the first resize arrives.
    pub initial_width: f64,
}

impl Default for CardGridConfig {
    fn default() -> Self {
        Self {
            grid: GridMetrics::default(),
            stagger_increment_ms: 40,
            resize_quiet_ms: 100,
            initial_width: 1280.0,
        }
    }
}

impl CardGridConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .grid
            .validate()
            .into_iter()
            .map(|e| format!("grid.{e}"))
            .collect();
        if !self.initial_width.is_finite() {
            errors.push(format!(
                "initial_width must be finite, got {}",
                self.initial_width
            ));
        }
        errors
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn stagger_increment(&self) -> Duration {
        Duration::from_millis(self.stagger_increment_ms)
    }

    #[must_use]
    pub fn resize_quiet(&self) -> Duration {
        Duration::from_millis(self.resize_quiet_ms)
    }
}

/// Errors from loading a [`CardGridConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-toml")]
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
