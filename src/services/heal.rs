//! Self-heal
//!
//! Cleans up what interrupted operations and manual deletions leave behind:
//! manifest entries for items that no longer exist and spawned files that no
//! manifest entry references. Safe to run any number of times.

use tracing::{debug, info};

use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;
use crate::storage::Storage;

use super::link::LinkService;

/// What a heal pass removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HealReport {
    /// Links dropped because their item is gone
    pub unlinked: Vec<ItemId>,
    /// Spawned files with no manifest entry
    pub removed_spawned: Vec<String>,
}

impl HealReport {
    pub fn is_empty(&self) -> bool {
        self.unlinked.is_empty() && self.removed_spawned.is_empty()
    }
}

/// Run one heal pass
///
/// Skipped silently when another process holds the vault lock.
pub fn run(storage: &Storage) -> DredgeResult<HealReport> {
    let _lock = match storage.lock() {
        Ok(lock) => lock,
        Err(DredgeError::Locked(path)) => {
            debug!(lock = %path.display(), "vault busy, skipping self-heal");
            return Ok(HealReport::default());
        }
        Err(e) => return Err(e),
    };

    let mut report = HealReport::default();
    let links = LinkService::new(storage);

    let manifest = storage.links.load()?;
    for id in manifest.ids() {
        if storage.items.exists(id)? {
            continue;
        }
        // Item is gone: there is nothing to sync, just drop the projection
        let _ = links.unlink_unlocked(id, None);
        info!(item = %id, "removed orphaned link");
        report.unlinked.push(id.clone());
    }

    let manifest = storage.links.load()?;
    for name in storage.spawned.list_names()? {
        let tracked = ItemId::parse(&name)
            .map(|id| manifest.contains(&id))
            .unwrap_or(false);
        if tracked {
            continue;
        }
        if storage.spawned.remove_name(&name)? {
            info!(file = %name, "removed orphaned spawned file");
            report.removed_spawned.push(name);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::DredgePaths;
    use crate::models::Item;
    use crate::services::ItemService;
    use std::fs;
    use tempfile::TempDir;

    const PW: &str = "pw";

    #[test]
    fn test_heal_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = DredgePaths::with_base_dir(temp_dir.path().join("data"));
        let storage = Storage::open(paths).unwrap();
        let items = ItemService::new(&storage);
        let links = LinkService::new(&storage);

        items
            .create(Some("keep"), Item::new_text("t", "k", vec![]), PW)
            .unwrap();
        items
            .create(Some("gone"), Item::new_text("t", "g", vec![]), PW)
            .unwrap();
        let keep = ItemId::parse("keep").unwrap();
        let gone = ItemId::parse("gone").unwrap();
        links.link(&keep, &temp_dir.path().join("k"), false, PW).unwrap();
        links.link(&gone, &temp_dir.path().join("g"), false, PW).unwrap();

        // Item file removed behind dredge's back, plus a stray projection
        fs::remove_file(storage.items.path(&gone)).unwrap();
        fs::write(storage.spawned.dir().join("stray"), "x").unwrap();

        let report = run(&storage).unwrap();
        assert_eq!(report.unlinked, vec![gone.clone()]);
        assert_eq!(report.removed_spawned, vec!["stray".to_string()]);

        assert!(links.is_linked(&keep));
        assert!(!links.is_linked(&gone));
        assert!(fs::symlink_metadata(temp_dir.path().join("g")).is_err());
        assert!(storage.spawned.path(&keep).exists());

        assert!(run(&storage).unwrap().is_empty());
    }

    #[test]
    fn test_heal_on_empty_vault() {
        let temp_dir = TempDir::new().unwrap();
        let paths = DredgePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        assert!(run(&storage).unwrap().is_empty());
    }
}
