//! Item service
//!
//! Business logic for items on top of the repository: ID allocation,
//! validation, link-aware reads and writes, renames and file import/export.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DredgeError, DredgeResult};
use crate::models::{Item, ItemId};
use crate::storage::file_io::write_new;
use crate::storage::Storage;

use super::link::LinkService;

/// Service for item management
pub struct ItemService<'a> {
    storage: &'a Storage,
}

impl<'a> ItemService<'a> {
    /// Create a new item service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Store a new item and return its ID
    ///
    /// Without an explicit ID a random one is generated, retrying on
    /// collision with live or trashed items up to the configured number of
    /// attempts.
    pub fn create(&self, id: Option<&str>, item: Item, password: &str) -> DredgeResult<ItemId> {
        item.validate()?;
        let _lock = self.storage.lock()?;

        if let Some(id) = id {
            let id = ItemId::parse(id)?;
            self.storage.items.create(&id, &item, password)?;
            info!(item = %id, "created item");
            return Ok(id);
        }

        let settings = self.storage.settings();
        for _ in 0..settings.max_id_attempts {
            let candidate = ItemId::random(settings.id_length);
            if self.storage.items.exists(&candidate)? || self.storage.trash.contains(&candidate) {
                debug!(item = %candidate, "generated ID taken, retrying");
                continue;
            }
            match self.storage.items.create(&candidate, &item, password) {
                Ok(()) => {
                    info!(item = %candidate, "created item");
                    return Ok(candidate);
                }
                Err(e) if e.is_already_exists() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(DredgeError::IdExhausted {
            attempts: settings.max_id_attempts,
        })
    }

    /// Decrypt an item without reconciling link drift
    pub fn read(&self, id: &str, password: &str) -> DredgeResult<Item> {
        let id = ItemId::parse(id)?;
        self.storage.items.load_raw(&id, password)
    }

    /// Decrypt an item, first folding in edits made through its link
    pub fn read_and_reconcile(&self, id: &str, password: &str) -> DredgeResult<Item> {
        let id = ItemId::parse(id)?;
        self.storage.items.require(&id)?;
        LinkService::new(self.storage).sync_if_needed(&id, password)?;
        self.storage.items.load_raw(&id, password)
    }

    /// Replace an item's content and metadata
    ///
    /// A linked item gets its spawned file rewritten so the projection
    /// matches the vault.
    pub fn update(&self, id: &str, mut item: Item, password: &str) -> DredgeResult<Item> {
        let id = ItemId::parse(id)?;
        item.validate()?;
        let _lock = self.storage.lock()?;

        self.storage.items.require(&id)?;
        item.touch();
        self.storage.items.store(&id, &item, password)?;
        LinkService::new(self.storage).refresh_projection(&id, &item)?;

        info!(item = %id, "updated item");
        Ok(item)
    }

    /// Permanently delete an item, bypassing the trash
    pub fn delete(&self, id: &str) -> DredgeResult<()> {
        let id = ItemId::parse(id)?;
        let _lock = self.storage.lock()?;

        self.storage.items.require(&id)?;
        let links = LinkService::new(self.storage);
        if links.is_linked(&id) {
            links.remove_projection(&id)?;
            self.storage.links.remove(&id)?;
        }
        self.storage.items.delete(&id)?;

        info!(item = %id, "deleted item");
        Ok(())
    }

    pub fn exists(&self, id: &str) -> DredgeResult<bool> {
        match ItemId::parse(id) {
            Ok(id) => self.storage.items.exists(&id),
            Err(_) => Ok(false),
        }
    }

    /// All item IDs, sorted
    pub fn list_ids(&self) -> DredgeResult<Vec<ItemId>> {
        self.storage.items.list_ids()
    }

    /// Decrypt every item
    pub fn list(&self, password: &str) -> DredgeResult<Vec<(ItemId, Item)>> {
        self.list_ids()?
            .into_iter()
            .map(|id| -> DredgeResult<(ItemId, Item)> {
                let item = self.storage.items.load_raw(&id, password)?;
                Ok((id, item))
            })
            .collect()
    }

    /// Give an item a new ID, carrying its link along
    pub fn rename(&self, old: &str, new: &str, password: &str) -> DredgeResult<ItemId> {
        let old = ItemId::parse(old)?;
        let new = ItemId::parse(new)?;
        let _lock = self.storage.lock()?;

        self.storage.items.require(&old)?;
        if self.storage.items.exists(&new)? {
            return Err(DredgeError::item_exists(new.as_str()));
        }

        let links = LinkService::new(self.storage);
        let target = links.get_linked_path(&old);
        if target.is_some() {
            match links.unlink_unlocked(&old, Some(password)) {
                Ok(()) | Err(DredgeError::NothingToCleanUp(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.storage.items.rename(&old, &new)?;

        if let Some(target) = target {
            links.link_unlocked(&new, &target, true, password)?;
        }

        info!(from = %old, to = %new, "renamed item");
        Ok(new)
    }

    /// Import a file from disk
    ///
    /// UTF-8 text becomes a text item; anything else is stored as a file
    /// item. The title defaults to the file name.
    pub fn add_file(
        &self,
        title: Option<&str>,
        path: &Path,
        tags: Vec<String>,
        password: &str,
    ) -> DredgeResult<ItemId> {
        let data = fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DredgeError::NotFound {
                    entity_type: "File",
                    identifier: path.display().to_string(),
                }
            } else {
                DredgeError::io(format!("Failed to read {}", path.display()), e)
            }
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DredgeError::InvalidInput(format!("path has no file name: {}", path.display()))
            })?
            .to_string();
        let title = title.unwrap_or(&filename).to_string();

        let item = Item::from_file_contents(title, filename, &data, tags);
        self.create(None, item, password)
    }

    /// Write a file item's bytes back to disk
    ///
    /// A directory destination receives the item's original file name. An
    /// existing file is never overwritten.
    pub fn export_file(&self, id: &str, dest: &Path, password: &str) -> DredgeResult<PathBuf> {
        let item = self.read(id, password)?;
        let data = item.decode_file()?;

        let dest = if dest.is_dir() {
            let filename = item.filename.as_deref().ok_or_else(|| {
                DredgeError::InvalidInput("item has no filename and destination is a directory".into())
            })?;
            dest.join(filename)
        } else {
            dest.to_path_buf()
        };

        write_new(&dest, &data)?;
        info!(item = %id, dest = %dest.display(), bytes = data.len(), "exported file item");
        Ok(dest)
    }
}
