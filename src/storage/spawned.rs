//! Spawned files
//!
//! Plaintext projections of linked text items, one per item ID, in a
//! private directory. Symlinks elsewhere on the filesystem point here.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;

use super::file_io::{remove_if_exists, write_atomic};

/// Content hash in the manifest's `sha256:<hex>` form
pub fn hash_content(data: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(data))
}

/// The spawned-files directory
#[derive(Debug, Clone)]
pub struct SpawnArea {
    dir: PathBuf,
}

impl SpawnArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the spawned file for an item
    pub fn path(&self, id: &ItemId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Write (or rewrite) the spawned file and return its hash
    pub fn write(&self, id: &ItemId, content: &str) -> DredgeResult<String> {
        write_atomic(self.path(id), content.as_bytes())?;
        Ok(hash_content(content.as_bytes()))
    }

    /// Read the spawned file's bytes
    pub fn read(&self, id: &ItemId) -> DredgeResult<Vec<u8>> {
        let path = self.path(id);
        fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DredgeError::NotFound {
                    entity_type: "Spawned file",
                    identifier: id.to_string(),
                }
            } else {
                DredgeError::io(format!("Failed to read spawned file {}", path.display()), e)
            }
        })
    }

    /// Remove the spawned file; returns whether one existed
    pub fn remove(&self, id: &ItemId) -> DredgeResult<bool> {
        remove_if_exists(self.path(id))
    }

    /// Remove an arbitrary entry of the spawn directory by name
    pub fn remove_name(&self, name: &str) -> DredgeResult<bool> {
        remove_if_exists(self.dir.join(name))
    }

    /// Names of every file currently in the spawn directory
    pub fn list_names(&self) -> DredgeResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DredgeError::io("Failed to read spawned directory", e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DredgeError::io("Failed to read directory entry", e))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
