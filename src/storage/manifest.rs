//! Link manifest
//!
//! `links.json` maps item IDs to the path they are projected to and the hash
//! of the spawned file as of the last sync. The file is rewritten wholesale
//! on every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DredgeResult;
use crate::models::ItemId;

use super::file_io::{read_json, write_json_atomic};

/// A single active link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Absolute path of the symlink
    pub path: PathBuf,
    /// `sha256:<hex>` of the spawned file at last sync
    pub hash: String,
}

/// All active links, keyed by item ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkManifest {
    entries: BTreeMap<ItemId, LinkEntry>,
}

impl LinkManifest {
    pub fn get(&self, id: &ItemId) -> Option<&LinkEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: ItemId, entry: LinkEntry) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<LinkEntry> {
        self.entries.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &LinkEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistence for the link manifest
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest; a missing file is an empty manifest
    pub fn load(&self) -> DredgeResult<LinkManifest> {
        read_json(&self.path)
    }

    /// Write the manifest atomically
    pub fn save(&self, manifest: &LinkManifest) -> DredgeResult<()> {
        write_json_atomic(&self.path, manifest)
    }

    /// Look up a link, treating an unreadable manifest as "not linked"
    pub fn get(&self, id: &ItemId) -> Option<LinkEntry> {
        self.load().ok().and_then(|m| m.get(id).cloned())
    }

    /// Remove one entry and save
    pub fn remove(&self, id: &ItemId) -> DredgeResult<Option<LinkEntry>> {
        let mut manifest = self.load()?;
        let removed = manifest.remove(id);
        if removed.is_some() {
            self.save(&manifest)?;
        }
        Ok(removed)
    }

    /// Replace the stored hash of an existing entry
    pub fn set_hash(&self, id: &ItemId, hash: String) -> DredgeResult<()> {
        let mut manifest = self.load()?;
        if let Some(entry) = manifest.entries.get_mut(id) {
            entry.hash = hash;
            self.save(&manifest)?;
        }
        Ok(())
    }
}
