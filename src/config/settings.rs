//! User settings for dredge
//!
//! Small knobs persisted as `config.json` inside the vault directory. A
//! missing file means defaults; nothing is written until the caller saves.

use serde::{Deserialize, Serialize};

use super::paths::DredgePaths;
use crate::error::DredgeError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// User settings for dredge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Length of generated item IDs
    #[serde(default = "default_id_length")]
    pub id_length: usize,

    /// How many random IDs to try before giving up
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: u32,

    /// Hold an advisory lock during write operations
    #[serde(default = "default_lock_writes")]
    pub lock_writes: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_id_length() -> usize {
    3
}

fn default_max_id_attempts() -> u32 {
    10
}

fn default_lock_writes() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            id_length: default_id_length(),
            max_id_attempts: default_max_id_attempts(),
            lock_writes: default_lock_writes(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist
    pub fn load_or_default(paths: &DredgePaths) -> Result<Self, DredgeError> {
        let settings: Settings = read_json(paths.settings_file())
            .map_err(|e| DredgeError::Config(format!("Failed to load settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &DredgePaths) -> Result<(), DredgeError> {
        self.validate()?;
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    fn validate(&self) -> Result<(), DredgeError> {
        if !(1..=32).contains(&self.id_length) {
            return Err(DredgeError::Config(format!(
                "id_length must be between 1 and 32 (got {})",
                self.id_length
            )));
        }
        if self.max_id_attempts == 0 {
            return Err(DredgeError::Config(
                "max_id_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
