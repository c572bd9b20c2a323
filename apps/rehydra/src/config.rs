//! # Configuration
//!
//! Optional TOML configuration. An explicit `--config` path must exist;
//! otherwise `rehydra.toml` in the working directory is used when present.
//!
//! ```toml
//! [rehydrate]
//! strict_duplicates = true
//! max_call_depth = 256
//! ```
//!
//! Command-line flags override file values.

use crate::error::AppError;
use rehydra_core::primitives::MAX_CALL_DEPTH;
use rehydra_core::{DuplicatePolicy, SessionOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "rehydra.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rehydrate: RehydrateConfig,
}

/// `[rehydrate]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RehydrateConfig {
    /// Reject environments with duplicate definition names.
    pub strict_duplicates: bool,
    /// Maximum nesting of definition rehydration.
    pub max_call_depth: usize,
}

impl Default for RehydrateConfig {
    fn default() -> Self {
        Self {
            strict_duplicates: false,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        toml::from_str(&content).map_err(|e| AppError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load `explicit` if given, else the default file if it exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!(path = %default.display(), "using default config file");
            Self::load(default)
        } else {
            Ok(Self::default())
        }
    }

    /// Session options after applying command-line overrides.
    #[must_use]
    pub fn session_options(&self, strict: bool, max_call_depth: Option<usize>) -> SessionOptions {
        let duplicates = if strict || self.rehydrate.strict_duplicates {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::Replace
        };

        SessionOptions {
            duplicates,
            max_call_depth: max_call_depth.unwrap_or(self.rehydrate.max_call_depth),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.rehydrate.max_call_depth, MAX_CALL_DEPTH);
    }

    #[test]
    fn flags_override_file_values() {
        let config: Config =
            toml::from_str("[rehydrate]\nmax_call_depth = 64\n").expect("parse");

        let from_file = config.session_options(false, None);
        assert_eq!(from_file.max_call_depth, 64);
        assert_eq!(from_file.duplicates, DuplicatePolicy::Replace);

        let overridden = config.session_options(true, Some(8));
        assert_eq!(overridden.max_call_depth, 8);
        assert_eq!(overridden.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[rehydrate]\nstrict = true\n").is_err());
    }
}
