//! Advisory vault lock
//!
//! Write-class operations hold an exclusive `flock`-style lock on
//! `<vault>/.lock`. Contention fails immediately instead of waiting.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::FileExt;
use tracing::{debug, warn};

use crate::error::{DredgeError, DredgeResult};

/// Held lock; released on drop
#[derive(Debug)]
pub struct VaultLock {
    file: File,
    path: PathBuf,
}

impl VaultLock {
    /// Try to take the lock without blocking
    pub fn acquire(path: &Path) -> DredgeResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| DredgeError::io(format!("Failed to open lock {}", path.display()), e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "acquired vault lock");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                Err(DredgeError::Locked(path.to_path_buf()))
            }
            Err(e) => Err(DredgeError::io(format!("Failed to lock {}", path.display()), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release vault lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lock_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".lock");

        let held = VaultLock::acquire(&path).unwrap();
        assert!(matches!(
            VaultLock::acquire(&path),
            Err(DredgeError::Locked(_))
        ));

        drop(held);
        assert!(VaultLock::acquire(&path).is_ok());
    }
}
