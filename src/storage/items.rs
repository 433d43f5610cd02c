//! Item repository
//!
//! One encrypted envelope per item, file name = item ID. This layer only
//! knows about bytes on disk: sealing (serialize + encrypt), opening
//! (decrypt + deserialize) and whole-file writes. It never looks at links,
//! so [`ItemRepository::load_raw`] is always a pure read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::crypto;
use crate::error::{DredgeError, DredgeResult};
use crate::models::{Item, ItemId};

use super::file_io::{remove_if_exists, write_atomic, write_new};

/// Serialize and encrypt an item
pub fn seal_item(item: &Item, password: &str) -> DredgeResult<Vec<u8>> {
    let text = serde_yaml::to_string(item)
        .map_err(|e| DredgeError::Io(format!("Failed to serialize item: {}", e)))?;
    crypto::encrypt(text.as_bytes(), password)
}

/// Decrypt and deserialize an item envelope
pub fn open_item(envelope: &[u8], password: &str) -> DredgeResult<Item> {
    let plaintext = crypto::decrypt(envelope, password)?;
    let item: Item = serde_yaml::from_slice(&plaintext)
        .map_err(|e| DredgeError::Corrupted(format!("Failed to decode item: {}", e)))?;
    item.validate()
        .map_err(|e| DredgeError::Corrupted(e.to_string()))?;
    Ok(item)
}

/// Repository for encrypted item files
#[derive(Debug, Clone)]
pub struct ItemRepository {
    dir: PathBuf,
}

impl ItemRepository {
    /// Create a repository over a directory
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the item files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an item file
    pub fn path(&self, id: &ItemId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Check if an item exists
    pub fn exists(&self, id: &ItemId) -> DredgeResult<bool> {
        let path = self.path(id);
        path.try_exists()
            .map_err(|e| DredgeError::io(format!("Failed to check {}", path.display()), e))
    }

    /// Fail with `NotFound` unless the item exists
    pub fn require(&self, id: &ItemId) -> DredgeResult<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(DredgeError::item_not_found(id.as_str()))
        }
    }

    /// List all item IDs, sorted
    ///
    /// Entries that are not valid IDs (temp files, stray directories) are
    /// skipped.
    pub fn list_ids(&self) -> DredgeResult<Vec<ItemId>> {
        list_ids_in(&self.dir)
    }

    /// Write a new item file; never overwrites
    pub fn create(&self, id: &ItemId, item: &Item, password: &str) -> DredgeResult<()> {
        let envelope = seal_item(item, password)?;
        write_new(self.path(id), &envelope).map_err(|e| {
            if e.is_already_exists() {
                DredgeError::item_exists(id.as_str())
            } else {
                e
            }
        })
    }

    /// Decrypt an item without any side effects
    pub fn load_raw(&self, id: &ItemId, password: &str) -> DredgeResult<Item> {
        let path = self.path(id);
        let envelope = fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DredgeError::item_not_found(id.as_str())
            } else {
                DredgeError::io(format!("Failed to read item {}", id), e)
            }
        })?;
        open_item(&envelope, password)
    }

    /// Replace an item file wholesale
    pub fn store(&self, id: &ItemId, item: &Item, password: &str) -> DredgeResult<()> {
        let envelope = seal_item(item, password)?;
        write_atomic(self.path(id), &envelope)
    }

    /// Delete an item file
    pub fn delete(&self, id: &ItemId) -> DredgeResult<()> {
        if remove_if_exists(self.path(id))? {
            Ok(())
        } else {
            Err(DredgeError::item_not_found(id.as_str()))
        }
    }

    /// Rename an item file; the destination must be free
    pub fn rename(&self, old: &ItemId, new: &ItemId) -> DredgeResult<()> {
        self.require(old)?;
        if self.exists(new)? {
            return Err(DredgeError::item_exists(new.as_str()));
        }
        fs::rename(self.path(old), self.path(new))
            .map_err(|e| DredgeError::io(format!("Failed to rename item {} to {}", old, new), e))
    }
}

/// List valid item IDs among the plain files of a directory
pub fn list_ids_in(dir: &Path) -> DredgeResult<Vec<ItemId>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DredgeError::io(
                format!("Failed to read {}", dir.display()),
                e,
            ))
        }
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DredgeError::io("Failed to read directory entry", e))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| ItemId::parse(name).ok())
        {
            ids.push(id);
        }
    }

    ids.sort();
    Ok(ids)
}

/// Put a rotation backup back in place of an absent or empty items
/// directory
///
/// Returns whether the backup was moved. A non-empty items directory is
/// never touched, so this cannot clobber live data.
pub fn restore_backup_dir(items_dir: &Path, backup: &Path) -> DredgeResult<bool> {
    if !backup.is_dir() {
        return Ok(false);
    }

    match fs::read_dir(items_dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Ok(false);
            }
            fs::remove_dir(items_dir).map_err(|e| {
                DredgeError::io(format!("Failed to remove empty {}", items_dir.display()), e)
            })?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(DredgeError::io(
                format!("Failed to read {}", items_dir.display()),
                e,
            ))
        }
    }

    fs::rename(backup, items_dir).map_err(|e| {
        DredgeError::io(format!("Failed to restore {}", backup.display()), e)
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;
    use tempfile::TempDir;

    fn repo() -> (TempDir, ItemRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = ItemRepository::new(temp_dir.path().join("items"));
        fs::create_dir_all(repo.dir()).unwrap();
        (temp_dir, repo)
    }

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    #[test]
    fn test_create_and_load() {
        let (_tmp, repo) = repo();
        let item = Item::new_text("SSH Config", "Host github.com", vec!["ssh".into()]);

        repo.create(&id("abc"), &item, "pw").unwrap();
        let loaded = repo.load_raw(&id("abc"), "pw").unwrap();

        assert_eq!(loaded, item);
        assert_eq!(loaded.kind, ItemKind::Text);
    }

    #[test]
    fn test_file_on_disk_is_encrypted() {
        let (_tmp, repo) = repo();
        let item = Item::new_text("t", "plaintext-marker", vec![]);
        repo.create(&id("abc"), &item, "pw").unwrap();

        let raw = fs::read(repo.path(&id("abc"))).unwrap();
        let needle = b"plaintext-marker";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_create_never_overwrites() {
        let (_tmp, repo) = repo();
        let first = Item::new_text("first", "1", vec![]);
        repo.create(&id("abc"), &first, "pw").unwrap();

        let err = repo
            .create(&id("abc"), &Item::new_text("second", "2", vec![]), "pw")
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(repo.load_raw(&id("abc"), "pw").unwrap().title, "first");
    }

    #[test]
    fn test_load_missing() {
        let (_tmp, repo) = repo();
        assert!(repo.load_raw(&id("nop"), "pw").unwrap_err().is_not_found());
    }

    #[test]
    fn test_truncated_file_fails_fast() {
        let (_tmp, repo) = repo();
        repo.create(&id("abc"), &Item::new_text("t", "c", vec![]), "pw")
            .unwrap();

        let path = repo.path(&id("abc"));
        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..20]).unwrap();
        assert!(matches!(
            repo.load_raw(&id("abc"), "pw"),
            Err(DredgeError::TooShort { .. })
        ));

        fs::write(&path, &raw[..raw.len() - 1]).unwrap();
        assert!(matches!(
            repo.load_raw(&id("abc"), "pw"),
            Err(DredgeError::WrongPassword)
        ));
    }

    #[test]
    fn test_valid_envelope_with_bad_payload_is_corrupted() {
        let (_tmp, repo) = repo();
        let envelope = crypto::encrypt(b"[not, an, item]", "pw").unwrap();
        fs::write(repo.path(&id("bad")), envelope).unwrap();

        assert!(matches!(
            repo.load_raw(&id("bad"), "pw"),
            Err(DredgeError::Corrupted(_))
        ));
    }

    #[test]
    fn test_list_ids_sorted_and_filtered() {
        let (_tmp, repo) = repo();
        for name in ["zzz", "abc", "m_1"] {
            repo.create(&id(name), &Item::new_text("t", "c", vec![]), "pw")
                .unwrap();
        }
        fs::write(repo.dir().join("abc.tmp"), b"junk").unwrap();
        fs::create_dir(repo.dir().join("sub")).unwrap();

        let ids: Vec<String> = repo
            .list_ids()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, vec!["abc", "m_1", "zzz"]);
    }

    #[test]
    fn test_delete_and_rename() {
        let (_tmp, repo) = repo();
        repo.create(&id("abc"), &Item::new_text("t", "c", vec![]), "pw")
            .unwrap();
        repo.create(&id("def"), &Item::new_text("t", "c", vec![]), "pw")
            .unwrap();

        assert!(repo.rename(&id("abc"), &id("def")).unwrap_err().is_already_exists());
        repo.rename(&id("abc"), &id("xyz")).unwrap();
        assert!(!repo.exists(&id("abc")).unwrap());
        assert!(repo.exists(&id("xyz")).unwrap());

        repo.delete(&id("xyz")).unwrap();
        assert!(repo.delete(&id("xyz")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_restore_backup_into_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let items = temp_dir.path().join("items");
        let backup = temp_dir.path().join("items.old");
        fs::create_dir_all(&items).unwrap();
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("abc"), b"envelope").unwrap();

        assert!(restore_backup_dir(&items, &backup).unwrap());
        assert_eq!(fs::read(items.join("abc")).unwrap(), b"envelope");
        assert!(!backup.exists());

        assert!(!restore_backup_dir(&items, &backup).unwrap());
    }

    #[test]
    fn test_restore_backup_leaves_live_items_alone() {
        let temp_dir = TempDir::new().unwrap();
        let items = temp_dir.path().join("items");
        let backup = temp_dir.path().join("items.old");
        fs::create_dir_all(&items).unwrap();
        fs::create_dir_all(&backup).unwrap();
        fs::write(items.join("new"), b"live").unwrap();
        fs::write(backup.join("abc"), b"backup").unwrap();

        assert!(!restore_backup_dir(&items, &backup).unwrap());
        assert!(items.join("new").is_file());
        assert!(backup.join("abc").is_file());
    }
}
