//! Save orchestration settings.
//!
//! `SyncConfig` is embedded in the CLI profile file and can be parsed on its
//! own from JSON. Missing fields take their defaults; unknown fields are
//! rejected so that typos do not silently fall back.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolve::DUPLICATE_SUFFIX;

const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 5;
const MAX_DUPLICATE_SUFFIX_CHARS: usize = 64;

/// Settings for the save/retry orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Total save calls per request, the first optimistic save included
    #[serde(default = "default_max_save_attempts")]
    pub max_save_attempts: u32,
    /// Name suffix for remote copies kept alongside local ones
    #[serde(default = "default_duplicate_suffix")]
    pub duplicate_suffix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
            duplicate_suffix: DUPLICATE_SUFFIX.to_string(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a config from a raw JSON payload.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid sync config JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_save_attempts == 0 {
            return Err(Error::Config(
                "max_save_attempts must be at least 1".to_string(),
            ));
        }
        if self.duplicate_suffix.trim().is_empty() {
            return Err(Error::Config(
                "duplicate_suffix must not be blank".to_string(),
            ));
        }
        if self.duplicate_suffix.chars().count() > MAX_DUPLICATE_SUFFIX_CHARS {
            return Err(Error::Config(format!(
                "duplicate_suffix must be at most {MAX_DUPLICATE_SUFFIX_CHARS} characters"
            )));
        }
        Ok(())
    }
}

const fn default_max_save_attempts() -> u32 {
    DEFAULT_MAX_SAVE_ATTEMPTS
}

fn default_duplicate_suffix() -> String {
    DUPLICATE_SUFFIX.to_string()
}
