//! Configuration system for Groupsmith.
//!
//! Every numeric and string parameter the planner consumes goes through a
//! single typed accessor on [`ParamMap`] that fails loudly on an unknown
//! key. There are no silent defaults at the schema level; call sites supply
//! their own fallback for absent values, and [`Settings::from_params`] is
//! the one place that does so while validating ranges.
//!
//! # Examples
//!
//! Load parameters from a TOML string:
//!
//! ```
//! use groupsmith_config::{ParamMap, Settings};
//!
//! let params = ParamMap::from_toml_str(r#"
//!     [capacity]
//!     mode = "hard"
//!     max = 14
//!
//!     [cohort]
//!     max_spread = 2
//! "#).unwrap();
//!
//! let settings = Settings::from_params(&params).unwrap();
//! assert_eq!(settings.capacity_max, 14);
//! ```
//!
//! Unknown keys are rejected at load and access time:
//!
//! ```
//! use groupsmith_config::ParamMap;
//!
//! assert!(ParamMap::from_toml_str("[capacity]\nmaks = 3").is_err());
//! assert!(ParamMap::new().int("capacity.maks").is_err());
//! ```

mod params;
mod settings;

#[cfg(test)]
mod tests;

pub use params::{ParamKind, ParamMap, ParamValue};
pub use settings::{CapacityMode, Settings};

use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown parameter key: {0}")]
    UnknownKey(String),

    #[error("Parameter {key} has the wrong type (expected {expected})")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for groupsmith_core::GroupsmithError {
    fn from(err: ConfigError) -> Self {
        groupsmith_core::GroupsmithError::Validation(err.to_string())
    }
}
