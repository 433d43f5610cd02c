//! Session handling
//!
//! A session spans one terminal: every dredge invocation started from the
//! same shell shares the same parent process and therefore the same cached
//! password and undo list.

pub mod prompt;
pub mod store;
pub mod verify;

pub use prompt::{prompt_new_password, PasswordPrompt, ScriptedPrompt, TerminalPrompt};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use verify::{get_password_with_verification, PasswordVerifier, VERIFICATION_CONTENT};

use crate::config::paths::DredgePaths;
use crate::crypto::SecureString;
use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;

/// Process id of the invoking shell
#[cfg(unix)]
pub fn parent_pid() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
pub fn parent_pid() -> u32 {
    std::process::id()
}

/// Handle on the current session's state
pub struct Session {
    store: Box<dyn SessionStore>,
}

impl Session {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Session of the calling terminal, stored on disk
    pub fn for_current_terminal(paths: &DredgePaths) -> Self {
        Self::new(FileSessionStore::new(paths.session_dir(parent_pid())))
    }

    /// Session that is forgotten when dropped
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::new())
    }

    /// Remember a verified password for later invocations
    pub fn cache_password(&self, password: &str) -> DredgeResult<()> {
        if password.is_empty() {
            return Err(DredgeError::InvalidInput("password cannot be empty".into()));
        }
        self.store.save_password(&SecureString::new(password))
    }

    pub fn get_cached_password(&self) -> DredgeResult<Option<SecureString>> {
        self.store.load_password()
    }

    /// Forget the cached password
    pub fn clear_session(&self) -> DredgeResult<()> {
        self.store.clear_password()
    }

    pub fn has_active_session(&self) -> bool {
        matches!(self.store.load_password(), Ok(Some(_)))
    }

    /// Replace the undo list with the IDs of the latest deletion
    pub fn record_deleted(&self, ids: &[ItemId]) -> DredgeResult<()> {
        self.store.save_deleted(ids)
    }

    /// The first `count` recently deleted IDs (all of them when `count` is 0)
    pub fn deleted(&self, count: usize) -> DredgeResult<Vec<ItemId>> {
        let mut ids = self.store.load_deleted()?;
        if count > 0 && count < ids.len() {
            ids.truncate(count);
        }
        Ok(ids)
    }

    /// Keep only `pending` on the undo list; an empty list clears it
    pub fn set_pending_deleted(&self, pending: &[ItemId]) -> DredgeResult<()> {
        if pending.is_empty() {
            self.store.clear_deleted()
        } else {
            self.store.save_deleted(pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ItemId> {
        names.iter().map(|n| ItemId::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_password_cache() {
        let session = Session::in_memory();
        assert!(!session.has_active_session());
        assert!(session.get_cached_password().unwrap().is_none());

        assert!(session.cache_password("").is_err());
        session.cache_password("pw").unwrap();
        assert!(session.has_active_session());

        session.clear_session().unwrap();
        assert!(!session.has_active_session());
    }

    #[test]
    fn test_deleted_list() {
        let session = Session::in_memory();
        session.record_deleted(&ids(&["a", "b", "c"])).unwrap();

        assert_eq!(session.deleted(0).unwrap(), ids(&["a", "b", "c"]));
        assert_eq!(session.deleted(2).unwrap(), ids(&["a", "b"]));
        assert_eq!(session.deleted(9).unwrap(), ids(&["a", "b", "c"]));

        session.set_pending_deleted(&ids(&["c"])).unwrap();
        assert_eq!(session.deleted(0).unwrap(), ids(&["c"]));

        session.set_pending_deleted(&[]).unwrap();
        assert!(session.deleted(0).unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_session_by_ppid() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let paths = DredgePaths::with_base_dir(temp_dir.path().to_path_buf());
        let session = Session::for_current_terminal(&paths);

        session.cache_password("pw").unwrap();
        assert!(paths
            .session_dir(parent_pid())
            .join("session")
            .is_file());

        let again = Session::for_current_terminal(&paths);
        assert_eq!(again.get_cached_password().unwrap().unwrap().as_str(), "pw");
    }
}
