//! Storage layer for dredge
//!
//! Encrypted item files, the link manifest, spawned plaintext projections
//! and the trash bin, all under one data root. Everything is written with
//! whole-file replacement.

pub mod file_io;
pub mod items;
pub mod lock;
pub mod manifest;
pub mod spawned;
pub mod trash;

pub use file_io::{read_json, write_json_atomic};
pub use items::ItemRepository;
pub use lock::VaultLock;
pub use manifest::{LinkEntry, LinkManifest, ManifestStore};
pub use spawned::SpawnArea;
pub use trash::{TrashBin, TrashInfo};

use tracing::{debug, warn};

use crate::config::paths::DredgePaths;
use crate::config::settings::Settings;
use crate::error::DredgeError;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: DredgePaths,
    settings: Settings,
    pub items: ItemRepository,
    pub links: ManifestStore,
    pub spawned: SpawnArea,
    pub trash: TrashBin,
}

impl Storage {
    /// Open the vault, creating its directories on first use
    ///
    /// A rotation that died between moving `items/` aside and installing
    /// its replacement leaves only `items.old/`; that backup is moved back
    /// before anything else runs, unless another process holds the lock.
    pub fn open(paths: DredgePaths) -> Result<Self, DredgeError> {
        recover_interrupted_rotation(&paths)?;
        paths.ensure_directories()?;
        let settings = Settings::load_or_default(&paths)?;

        Ok(Self {
            items: ItemRepository::new(paths.items_dir()),
            links: ManifestStore::new(paths.links_file()),
            spawned: SpawnArea::new(paths.spawned_dir()),
            trash: TrashBin::new(
                paths.items_dir(),
                paths.trash_files_dir(),
                paths.trash_info_dir(),
            ),
            settings,
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &DredgePaths {
        &self.paths
    }

    /// Get the loaded settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Take the vault write lock, unless locking is disabled in settings
    pub fn lock(&self) -> Result<Option<VaultLock>, DredgeError> {
        if !self.settings.lock_writes {
            return Ok(None);
        }
        VaultLock::acquire(&self.paths.lock_file()).map(Some)
    }

    /// Check if a password has been set for this vault
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}

fn recover_interrupted_rotation(paths: &DredgePaths) -> Result<(), DredgeError> {
    let backup = paths.items_old_dir();
    if !backup.is_dir() {
        return Ok(());
    }

    let _lock = match VaultLock::acquire(&paths.lock_file()) {
        Ok(lock) => lock,
        Err(DredgeError::Locked(_)) => {
            debug!(backup = %backup.display(), "vault locked, leaving rotation backup alone");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if items::restore_backup_dir(&paths.items_dir(), &backup)? {
        warn!(backup = %backup.display(), "restored items from an interrupted password change");
    }
    Ok(())
}
