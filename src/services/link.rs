//! Link service
//!
//! Projects text items onto the filesystem: the decrypted content is written
//! to a private spawned file and a symlink at the user's chosen path points
//! to it. Programs that edit the symlink target edit the spawned file; the
//! next read notices the hash drift and folds the edit back into the vault.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{DredgeError, DredgeResult};
use crate::models::{Item, ItemId};
use crate::storage::spawned::hash_content;
use crate::storage::{LinkEntry, Storage};

/// Service for link management
pub struct LinkService<'a> {
    storage: &'a Storage,
}

impl<'a> LinkService<'a> {
    /// Create a new link service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Link a text item to an absolute path
    ///
    /// With `force`, whatever sits at `target` is removed first.
    pub fn link(&self, id: &ItemId, target: &Path, force: bool, password: &str) -> DredgeResult<()> {
        let _lock = self.storage.lock()?;
        self.link_unlocked(id, target, force, password)
    }

    pub(crate) fn link_unlocked(
        &self,
        id: &ItemId,
        target: &Path,
        force: bool,
        password: &str,
    ) -> DredgeResult<()> {
        if let Some(existing) = self.get_linked_path(id) {
            return Err(DredgeError::AlreadyExists {
                entity_type: "Link",
                identifier: format!("{} -> {}", id, existing.display()),
            });
        }

        let item = self.storage.items.load_raw(id, password)?;
        if !item.is_text() {
            return Err(DredgeError::InvalidInput(format!(
                "cannot link {} items, only text items",
                item.kind
            )));
        }

        if !target.is_absolute() {
            return Err(DredgeError::InvalidInput(format!(
                "target path must be absolute: {}",
                target.display()
            )));
        }

        if fs::symlink_metadata(target).is_ok() {
            if !force {
                return Err(DredgeError::AlreadyExists {
                    entity_type: "File",
                    identifier: target.display().to_string(),
                });
            }
            fs::remove_file(target).map_err(|e| {
                DredgeError::io(format!("Failed to remove {}", target.display()), e)
            })?;
        }

        match target.parent() {
            Some(parent) if parent.is_dir() => {}
            _ => {
                return Err(DredgeError::NotFound {
                    entity_type: "Directory",
                    identifier: target
                        .parent()
                        .unwrap_or(target)
                        .display()
                        .to_string(),
                })
            }
        }

        let hash = self.storage.spawned.write(id, &item.content)?;

        if let Err(e) = self.attach(id, target, hash) {
            if let Err(cleanup) = self.storage.spawned.remove(id) {
                warn!(item = %id, error = %cleanup, "failed to remove spawned file after failed link");
            }
            return Err(e);
        }

        info!(item = %id, target = %target.display(), "linked item");
        Ok(())
    }

    /// Symlink `target` to the spawned file and record the link
    fn attach(&self, id: &ItemId, target: &Path, hash: String) -> DredgeResult<()> {
        let spawned = fs::canonicalize(self.storage.spawned.path(id))
            .map_err(|e| DredgeError::io("Failed to resolve spawned file", e))?;

        create_symlink(&spawned, target).map_err(|e| {
            DredgeError::io(format!("Failed to create symlink {}", target.display()), e)
        })?;

        let recorded = self.storage.links.load().and_then(|mut manifest| {
            manifest.insert(
                id.clone(),
                LinkEntry {
                    path: target.to_path_buf(),
                    hash,
                },
            );
            self.storage.links.save(&manifest)
        });

        if recorded.is_err() {
            let _ = fs::remove_file(target);
        }
        recorded
    }

    /// Fold edits made through the link back into the encrypted item
    ///
    /// Returns whether the item was rewritten. Unlinked items and unchanged
    /// spawned files are left alone.
    pub fn sync_if_needed(&self, id: &ItemId, password: &str) -> DredgeResult<bool> {
        let entry = match self.storage.links.get(id) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        let data = match self.storage.spawned.read(id) {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                warn!(item = %id, "spawned file missing, nothing to sync");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let current = hash_content(&data);
        if current == entry.hash {
            return Ok(false);
        }

        let content = String::from_utf8(data).map_err(|_| {
            DredgeError::InvalidInput(format!("spawned file for {} is not valid UTF-8", id))
        })?;

        let mut item = self.storage.items.load_raw(id, password)?;
        item.content = content;
        item.touch();
        self.storage.items.store(id, &item, password)?;
        self.storage.links.set_hash(id, current)?;

        debug!(item = %id, "synced edits from spawned file");
        Ok(true)
    }

    /// Remove a link, keeping the item
    pub fn unlink(&self, id: &ItemId, password: &str) -> DredgeResult<()> {
        let _lock = self.storage.lock()?;
        self.unlink_unlocked(id, Some(password))
    }

    /// Unlink, reconciling first when a password is available and the item
    /// still exists
    pub(crate) fn unlink_unlocked(&self, id: &ItemId, password: Option<&str>) -> DredgeResult<()> {
        if !self.is_linked(id) {
            return Err(DredgeError::link_not_found(id.as_str()));
        }

        if let Some(password) = password {
            if self.storage.items.exists(id)? {
                if let Err(e) = self.sync_if_needed(id, password) {
                    warn!(item = %id, error = %e, "failed to sync before unlink");
                }
            }
        }

        let cleaned = self.remove_projection(id)?;
        self.storage.links.remove(id)?;

        if !cleaned {
            return Err(DredgeError::NothingToCleanUp(id.to_string()));
        }
        info!(item = %id, "unlinked item");
        Ok(())
    }

    /// Delete the symlink and spawned file of a linked item
    ///
    /// Returns whether anything was removed. A target that is no longer a
    /// symlink is left in place.
    pub(crate) fn remove_projection(&self, id: &ItemId) -> DredgeResult<bool> {
        let mut cleaned = false;

        if let Some(target) = self.get_linked_path(id) {
            match fs::symlink_metadata(&target) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    match fs::remove_file(&target) {
                        Ok(()) => cleaned = true,
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            warn!(target = %target.display(), error = %e, "failed to remove symlink")
                        }
                    }
                }
                Ok(_) => {
                    warn!(target = %target.display(), "link target is no longer a symlink, leaving it")
                }
                Err(_) => {}
            }
        }

        if self.storage.spawned.remove(id)? {
            cleaned = true;
        }
        Ok(cleaned)
    }

    /// Rewrite the spawned file after the item changed inside the vault
    pub(crate) fn refresh_projection(&self, id: &ItemId, item: &Item) -> DredgeResult<()> {
        if !self.is_linked(id) || !item.is_text() {
            return Ok(());
        }
        let hash = self.storage.spawned.write(id, &item.content)?;
        self.storage.links.set_hash(id, hash)
    }

    /// Where an item is linked, if it is
    pub fn get_linked_path(&self, id: &ItemId) -> Option<PathBuf> {
        self.storage.links.get(id).map(|entry| entry.path)
    }

    pub fn is_linked(&self, id: &ItemId) -> bool {
        self.storage.links.get(id).is_some()
    }
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn create_symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}
