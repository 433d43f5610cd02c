//! Path management for dredge
//!
//! ## Path Resolution Order
//!
//! 1. `DREDGE_DATA_DIR` environment variable (if set)
//! 2. The platform data directory (`$XDG_DATA_HOME` or `~/.local/share` on Linux)
//!
//! The vault lives in `<root>/dredge`, the trash in `<root>/Trash`. Session
//! state goes to the system temp directory unless the root was overridden,
//! in which case it stays under `<root>/sessions` so test runs and
//! sandboxes never touch shared `/tmp` state.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::DredgeError;

/// Environment variable that overrides the data root
pub const DATA_DIR_ENV: &str = "DREDGE_DATA_DIR";

const APP_DIR: &str = "dredge";

/// Manages all paths used by dredge
#[derive(Debug, Clone)]
pub struct DredgePaths {
    /// Root under which vault and trash live
    base_dir: PathBuf,
    /// Root for per-session directories
    session_root: PathBuf,
}

impl DredgePaths {
    /// Resolve paths from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, DredgeError> {
        if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            if !custom.is_empty() {
                return Ok(Self::with_base_dir(PathBuf::from(custom)));
            }
        }

        let base_dir = BaseDirs::new()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| DredgeError::Config("Could not determine home directory".into()))?;

        Ok(Self {
            base_dir,
            session_root: std::env::temp_dir().join(APP_DIR),
        })
    }

    /// Create DredgePaths rooted at a custom directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        let session_root = base_dir.join("sessions");
        Self {
            base_dir,
            session_root,
        }
    }

    /// Get the data root
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Vault directory (`<root>/dredge`)
    pub fn vault_dir(&self) -> PathBuf {
        self.base_dir.join(APP_DIR)
    }

    /// Directory holding one encrypted file per item
    pub fn items_dir(&self) -> PathBuf {
        self.vault_dir().join("items")
    }

    /// Staging directory used while rotating the password
    pub fn items_tmp_dir(&self) -> PathBuf {
        self.vault_dir().join("items.tmp")
    }

    /// Backup of the live items directory during a rotation swap
    pub fn items_old_dir(&self) -> PathBuf {
        self.vault_dir().join("items.old")
    }

    /// Directory of plaintext projections for linked items
    pub fn spawned_dir(&self) -> PathBuf {
        self.vault_dir().join(".spawned")
    }

    /// Link manifest
    pub fn links_file(&self) -> PathBuf {
        self.vault_dir().join("links.json")
    }

    /// Password verification envelope
    pub fn verify_file(&self) -> PathBuf {
        self.vault_dir().join(".dredge-key")
    }

    /// Advisory write lock
    pub fn lock_file(&self) -> PathBuf {
        self.vault_dir().join(".lock")
    }

    /// Settings file
    pub fn settings_file(&self) -> PathBuf {
        self.vault_dir().join("config.json")
    }

    /// Ignore file keeping plaintext out of any git remote
    pub fn gitignore_file(&self) -> PathBuf {
        self.vault_dir().join(".gitignore")
    }

    /// Trash root (`<root>/Trash`)
    pub fn trash_dir(&self) -> PathBuf {
        self.base_dir.join("Trash")
    }

    /// Trashed item files
    pub fn trash_files_dir(&self) -> PathBuf {
        self.trash_dir().join("files")
    }

    /// Trash sidecar records
    pub fn trash_info_dir(&self) -> PathBuf {
        self.trash_dir().join("info")
    }

    /// Root for per-session directories
    pub fn session_root(&self) -> &Path {
        &self.session_root
    }

    /// Session directory for a given parent process id
    pub fn session_dir(&self, ppid: u32) -> PathBuf {
        self.session_root.join(ppid.to_string())
    }

    /// Ensure the vault directories exist
    ///
    /// Creates the vault, items and spawned directories (owner-only) and the
    /// `.gitignore` if it is missing. The items directory is not created
    /// while a rotation backup (`items.old`) is waiting to be restored.
    pub fn ensure_directories(&self) -> Result<(), DredgeError> {
        create_private_dir(&self.vault_dir())?;
        create_private_dir(&self.spawned_dir())?;
        if !self.items_old_dir().exists() {
            create_private_dir(&self.items_dir())?;
        }

        let gitignore = self.gitignore_file();
        if !gitignore.exists() {
            std::fs::write(&gitignore, ".spawned/\nlinks.json\n.lock\n")
                .map_err(|e| DredgeError::io("Failed to create .gitignore", e))?;
        }

        Ok(())
    }

    /// Check if the vault has been initialized (verification file exists)
    pub fn is_initialized(&self) -> bool {
        self.verify_file().exists()
    }
}

/// Create a directory (and parents) readable only by the owner
pub fn create_private_dir(dir: &Path) -> Result<(), DredgeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(|e| DredgeError::io(format!("Failed to create {}", dir.display()), e))
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
            .map_err(|e| DredgeError::io(format!("Failed to create {}", dir.display()), e))
    }
}
