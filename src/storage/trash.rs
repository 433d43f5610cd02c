//! Trash bin following the freedesktop layout
//!
//! Deleted items are renamed into `Trash/files/dredge-<id>` and described by
//! a `Trash/info/dredge-<id>.trashinfo` sidecar, so desktop file managers can
//! show them next to everything else the user deleted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::paths::create_private_dir;
use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;

use super::file_io::{remove_if_exists, write_atomic};

const ITEM_PREFIX: &str = "dredge-";
const INFO_EXT: &str = ".trashinfo";

/// Parsed `.trashinfo` sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashInfo {
    /// Where the item lived before deletion
    pub original_path: PathBuf,
    pub deleted_at: DateTime<Utc>,
}

impl TrashInfo {
    fn render(&self) -> String {
        format!(
            "[Trash Info]\nPath={}\nDeletionDate={}\n",
            self.original_path.display(),
            self.deleted_at.to_rfc3339()
        )
    }

    fn parse(text: &str) -> DredgeResult<Self> {
        let mut lines = text.lines();
        if lines.next().map(str::trim) != Some("[Trash Info]") {
            return Err(DredgeError::Corrupted("missing [Trash Info] header".into()));
        }

        let mut path = None;
        let mut date = None;
        for line in lines {
            if let Some(value) = line.strip_prefix("Path=") {
                path = Some(PathBuf::from(value));
            } else if let Some(value) = line.strip_prefix("DeletionDate=") {
                let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|e| {
                    DredgeError::Corrupted(format!("invalid DeletionDate: {}", e))
                })?;
                date = Some(parsed.with_timezone(&Utc));
            }
        }

        match (path, date) {
            (Some(original_path), Some(deleted_at)) => Ok(Self {
                original_path,
                deleted_at,
            }),
            _ => Err(DredgeError::Corrupted(
                "trashinfo lacks Path or DeletionDate".into(),
            )),
        }
    }
}

/// Trash bin for item files
#[derive(Debug, Clone)]
pub struct TrashBin {
    items_dir: PathBuf,
    files_dir: PathBuf,
    info_dir: PathBuf,
}

impl TrashBin {
    pub fn new(items_dir: PathBuf, files_dir: PathBuf, info_dir: PathBuf) -> Self {
        Self {
            items_dir,
            files_dir,
            info_dir,
        }
    }

    /// Path of a trashed item file
    pub fn file_path(&self, id: &ItemId) -> PathBuf {
        self.files_dir.join(format!("{}{}", ITEM_PREFIX, id))
    }

    /// Path of a trashed item's sidecar
    pub fn info_path(&self, id: &ItemId) -> PathBuf {
        self.info_dir.join(format!("{}{}{}", ITEM_PREFIX, id, INFO_EXT))
    }

    fn item_path(&self, id: &ItemId) -> PathBuf {
        self.items_dir.join(id.as_str())
    }

    fn ensure_dirs(&self) -> DredgeResult<()> {
        create_private_dir(&self.files_dir)?;
        create_private_dir(&self.info_dir)
    }

    /// Check if an item is sitting in the trash
    pub fn contains(&self, id: &ItemId) -> bool {
        self.file_path(id).is_file()
    }

    /// Fail with `AlreadyExists` if an earlier deletion of `id` is still
    /// in the trash
    pub fn ensure_slot_free(&self, id: &ItemId) -> DredgeResult<()> {
        if self.contains(id) || self.info_path(id).exists() {
            return Err(DredgeError::AlreadyExists {
                entity_type: "Trash entry",
                identifier: format!(
                    "{} (an earlier deletion is still in the trash; rename this item first)",
                    id
                ),
            });
        }
        Ok(())
    }

    /// Move a live item into the trash and write its sidecar
    ///
    /// An earlier trashed item with the same ID is never replaced; that
    /// case is `AlreadyExists`. If the sidecar cannot be written the item
    /// is moved back.
    pub fn move_to_trash(&self, id: &ItemId) -> DredgeResult<()> {
        let item_path = self.item_path(id);
        if !item_path.is_file() {
            return Err(DredgeError::item_not_found(id.as_str()));
        }
        self.ensure_slot_free(id)?;
        self.ensure_dirs()?;

        let trashed = self.file_path(id);
        fs::rename(&item_path, &trashed)
            .map_err(|e| DredgeError::io(format!("Failed to move item {} to trash", id), e))?;

        let info = TrashInfo {
            original_path: item_path.clone(),
            deleted_at: Utc::now(),
        };
        if let Err(e) = write_atomic(self.info_path(id), info.render().as_bytes()) {
            if let Err(back) = fs::rename(&trashed, &item_path) {
                warn!(item = %id, error = %back, "failed to move item back out of trash");
            }
            return Err(e);
        }

        Ok(())
    }

    /// Move a trashed item back into the live items directory
    pub fn restore_from_trash(&self, id: &ItemId) -> DredgeResult<()> {
        let trashed = self.file_path(id);
        if !trashed.is_file() {
            return Err(DredgeError::trash_not_found(id.as_str()));
        }

        let item_path = self.item_path(id);
        if item_path.exists() {
            return Err(DredgeError::item_exists(id.as_str()));
        }

        fs::rename(&trashed, &item_path)
            .map_err(|e| DredgeError::io(format!("Failed to restore item {} from trash", id), e))?;

        if let Err(e) = remove_if_exists(self.info_path(id)) {
            warn!(item = %id, error = %e, "failed to delete trashinfo sidecar");
        }

        Ok(())
    }

    /// Read the sidecar of a trashed item
    pub fn info(&self, id: &ItemId) -> DredgeResult<TrashInfo> {
        let path = self.info_path(id);
        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DredgeError::trash_not_found(id.as_str())
            } else {
                DredgeError::io(format!("Failed to read {}", path.display()), e)
            }
        })?;
        TrashInfo::parse(&text)
    }

    /// IDs of every dredge item currently in the trash
    pub fn list_ids(&self) -> DredgeResult<Vec<ItemId>> {
        list_prefixed(&self.files_dir)
    }
}

fn list_prefixed(dir: &Path) -> DredgeResult<Vec<ItemId>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DredgeError::io("Failed to read trash directory", e)),
    };

    let mut ids = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let id = name
            .to_str()
            .and_then(|n| n.strip_prefix(ITEM_PREFIX))
            .and_then(|n| ItemId::parse(n).ok());
        if let Some(id) = id {
            ids.push(id);
        }
    }
    ids.sort();
    Ok(ids)
}
