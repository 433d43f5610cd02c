//! Session state backends
//!
//! A session holds the verified password and the list of recently deleted
//! item IDs. The CLI keeps it in a per-terminal directory; tests keep it in
//! memory.

use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::paths::create_private_dir;
use crate::crypto::SecureString;
use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;
use crate::storage::file_io::{read_json, remove_if_exists, write_atomic, write_json_atomic};

const PASSWORD_FILE: &str = "session";
const DELETED_FILE: &str = "deleted";

/// Where session state is kept
pub trait SessionStore {
    /// Cached password, if any
    fn load_password(&self) -> DredgeResult<Option<SecureString>>;

    fn save_password(&self, password: &SecureString) -> DredgeResult<()>;

    fn clear_password(&self) -> DredgeResult<()>;

    /// Recently deleted IDs, most relevant first
    fn load_deleted(&self) -> DredgeResult<Vec<ItemId>>;

    fn save_deleted(&self, ids: &[ItemId]) -> DredgeResult<()>;

    fn clear_deleted(&self) -> DredgeResult<()>;
}

/// Session files in a private directory keyed by the parent process
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn password_path(&self) -> PathBuf {
        self.dir.join(PASSWORD_FILE)
    }

    fn deleted_path(&self) -> PathBuf {
        self.dir.join(DELETED_FILE)
    }
}

impl SessionStore for FileSessionStore {
    fn load_password(&self) -> DredgeResult<Option<SecureString>> {
        match fs::read_to_string(self.password_path()) {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(SecureString::new(text))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DredgeError::io("Failed to read session cache", e)),
        }
    }

    fn save_password(&self, password: &SecureString) -> DredgeResult<()> {
        create_private_dir(&self.dir)?;
        write_atomic(self.password_path(), password.as_bytes())
    }

    fn clear_password(&self) -> DredgeResult<()> {
        remove_if_exists(self.password_path()).map(|_| ())
    }

    fn load_deleted(&self) -> DredgeResult<Vec<ItemId>> {
        read_json(self.deleted_path())
    }

    fn save_deleted(&self, ids: &[ItemId]) -> DredgeResult<()> {
        create_private_dir(&self.dir)?;
        write_json_atomic(self.deleted_path(), &ids)
    }

    fn clear_deleted(&self) -> DredgeResult<()> {
        remove_if_exists(self.deleted_path()).map(|_| ())
    }
}

/// Session state that lives only as long as the value
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    password: RefCell<Option<SecureString>>,
    deleted: RefCell<Vec<ItemId>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load_password(&self) -> DredgeResult<Option<SecureString>> {
        Ok(self.password.borrow().clone())
    }

    fn save_password(&self, password: &SecureString) -> DredgeResult<()> {
        *self.password.borrow_mut() = Some(password.clone());
        Ok(())
    }

    fn clear_password(&self) -> DredgeResult<()> {
        self.password.borrow_mut().take();
        Ok(())
    }

    fn load_deleted(&self) -> DredgeResult<Vec<ItemId>> {
        Ok(self.deleted.borrow().clone())
    }

    fn save_deleted(&self, ids: &[ItemId]) -> DredgeResult<()> {
        *self.deleted.borrow_mut() = ids.to_vec();
        Ok(())
    }

    fn clear_deleted(&self) -> DredgeResult<()> {
        self.deleted.borrow_mut().clear();
        Ok(())
    }
}
