//! File I/O utilities with atomic writes
//!
//! Every persistent file in the vault is replaced wholesale: write a sibling
//! temp file, sync it, rename over the target. Files are created owner-only.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::DredgeError;

/// Permission bits for every file dredge writes
#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, DredgeError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(DredgeError::io(format!("Failed to open {}", path.display()), e)),
    };

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| DredgeError::Corrupted(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), DredgeError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = serde_json::to_vec_pretty(data)
        .map_err(|e| DredgeError::Io(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path, &json)
}

/// Write bytes to a file atomically (write to temp, then rename)
///
/// This ensures that the file is either completely written or not modified at all.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), DredgeError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            DredgeError::io(format!("Failed to create directory {}", parent.display()), e)
        })?;
    }

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_path = temp_sibling(path);

    let result = write_private(&temp_path, data, false).and_then(|()| {
        fs::rename(&temp_path, path)
            .map_err(|e| DredgeError::io(format!("Failed to replace {}", path.display()), e))
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Write bytes to a file that must not exist yet
///
/// Fails with `AlreadyExists` instead of overwriting.
pub fn write_new<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), DredgeError> {
    let path = path.as_ref();
    write_private(path, data, true).map_err(|e| match e {
        DredgeError::AlreadyExists { .. } => DredgeError::AlreadyExists {
            entity_type: "File",
            identifier: path.display().to_string(),
        },
        other => other,
    })
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool, DredgeError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DredgeError::io(format!("Failed to remove {}", path.display()), e)),
    }
}

/// Remove a directory tree, treating "already gone" as success
pub fn remove_dir_if_exists<P: AsRef<Path>>(path: P) -> Result<bool, DredgeError> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DredgeError::io(format!("Failed to remove {}", path.display()), e)),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_private(path: &Path, data: &[u8], create_new: bool) -> Result<(), DredgeError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PRIVATE_FILE_MODE);
    }

    let file = options.open(path).map_err(|e| {
        if e.kind() == ErrorKind::AlreadyExists {
            DredgeError::AlreadyExists {
                entity_type: "File",
                identifier: path.display().to_string(),
            }
        } else {
            DredgeError::io(format!("Failed to create {}", path.display()), e)
        }
    })?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(data)
        .and_then(|()| writer.flush())
        .map_err(|e| DredgeError::io(format!("Failed to write {}", path.display()), e))?;

    // Sync to disk before any rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| DredgeError::io(format!("Failed to sync {}", path.display()), e))
}
