//! Error types for dredge
//!
//! One error enum covers the whole core. Variants map onto the failure
//! classes callers need to tell apart: missing resources, collisions, bad
//! passwords, corrupted payloads, bad input, I/O and multi-step operations
//! that could not reach their goal state.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for dredge operations
#[derive(Error, Debug)]
pub enum DredgeError {
    /// Referenced item, trash entry or manifest entry does not exist
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Creating or linking would overwrite an existing resource
    #[error("{entity_type} already exists: {identifier}")]
    AlreadyExists {
        entity_type: &'static str,
        identifier: String,
    },

    /// Authenticated decryption failed.
    ///
    /// Covers both an incorrect password and tampered ciphertext; the two
    /// are deliberately indistinguishable.
    #[error("wrong password (or data has been tampered with)")]
    WrongPassword,

    /// Envelope is shorter than salt + nonce + tag
    #[error("encrypted data too short: got {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// Decryption succeeded but the payload failed structural validation
    #[error("corrupted data: {0}")]
    Corrupted(String),

    /// Malformed ID, relative path, empty field, non-text link, ...
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every random ID candidate collided with an existing item
    #[error("could not generate a free item ID after {attempts} attempts")]
    IdExhausted { attempts: u32 },

    /// Unlink found neither the symlink nor the spawned file
    #[error("nothing to clean up for item {0} (symlink and spawned file already removed)")]
    NothingToCleanUp(String),

    /// Another process holds the vault write lock
    #[error("vault is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    /// A multi-step operation stopped half way and needs operator attention
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Cipher or key-derivation setup failures
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying filesystem failures
    #[error("I/O error: {0}")]
    Io(String),
}

impl DredgeError {
    /// Create a "not found" error for items
    pub fn item_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Item",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for trash entries
    pub fn trash_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Trash entry",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for links
    pub fn link_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Link",
            identifier: identifier.into(),
        }
    }

    /// Create an "already exists" error for items
    pub fn item_exists(identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: "Item",
            identifier: identifier.into(),
        }
    }

    /// Build an I/O error with a short description of what was attempted
    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", context, err))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl From<std::io::Error> for DredgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DredgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Result type alias for dredge operations
pub type DredgeResult<T> = Result<T, DredgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DredgeError::InvalidInput("target path must be absolute".into());
        assert_eq!(err.to_string(), "invalid input: target path must be absolute");
    }

    #[test]
    fn test_not_found_error() {
        let err = DredgeError::item_not_found("abc");
        assert_eq!(err.to_string(), "Item not found: abc");
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_too_short_error() {
        let err = DredgeError::TooShort { len: 10, min: 44 };
        assert_eq!(
            err.to_string(),
            "encrypted data too short: got 10 bytes, need at least 44"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DredgeError = io_err.into();
        assert!(matches!(err, DredgeError::Io(_)));
    }
}
