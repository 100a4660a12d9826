//! Configuration for a ledger instance.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! difficulty = 3
//! creator_id = 7
//! max_attempts = 5_000_000
//! parallel = false
//! ```

use crate::constants::{DEFAULT_CREATOR_ID, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_creator_id")]
    pub creator_id: u64,
    /// Upper bound on hashes tried per block; unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u64>,
    /// Search nonces on the rayon pool instead of the calling thread.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            creator_id: default_creator_id(),
            max_attempts: None,
            parallel: false,
        }
    }
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_creator_id() -> u64 {
    DEFAULT_CREATOR_ID
}

impl LedgerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                requested: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if self.max_attempts == Some(0) {
            return Err(LedgerError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
