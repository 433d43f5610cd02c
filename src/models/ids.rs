//! Item identifiers
//!
//! IDs are short strings over the URL-safe base64 alphabet. They double as
//! file names in the items, spawned and trash directories, so anything that
//! could escape a directory is rejected at parse time.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::DredgeError;

/// Longest accepted ID
pub const MAX_ID_LENGTH: usize = 64;

/// Identifier of a stored item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse and validate an ID
    pub fn parse(s: &str) -> Result<Self, DredgeError> {
        if s.is_empty() {
            return Err(DredgeError::InvalidInput("item ID cannot be empty".into()));
        }
        if s.len() > MAX_ID_LENGTH {
            return Err(DredgeError::InvalidInput(format!(
                "item ID too long ({} chars, max {})",
                s.len(),
                MAX_ID_LENGTH
            )));
        }
        if !s.chars().all(is_id_char) {
            return Err(DredgeError::InvalidInput(format!(
                "item ID may only contain letters, digits, '-' and '_' (got: {})",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Generate a random ID of the given length
    pub fn random(length: usize) -> Self {
        // Every 3 random bytes give 4 base64 characters
        let mut bytes = vec![0u8; length.div_ceil(4) * 3];
        OsRng.fill_bytes(&mut bytes);
        let mut encoded = URL_SAFE_NO_PAD.encode(&bytes);
        encoded.truncate(length);
        Self(encoded)
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItemId {
    type Err = DredgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = DredgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}
