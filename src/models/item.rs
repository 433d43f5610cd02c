//! Item model
//!
//! An item is one secret or config unit. Text items hold plaintext content;
//! file items hold base64-encoded binary plus the original filename and size.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DredgeError, DredgeResult};

/// Kind of content an item stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Plain text, linkable
    #[default]
    Text,
    /// Binary file, content is base64
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A stored item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Human label
    pub title: String,

    /// Tags, in the order they were given
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Text or file
    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// When the item was created
    pub created: DateTime<Utc>,

    /// When the item was last written
    pub modified: DateTime<Utc>,

    /// Original filename (file items)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Declared decoded size in bytes (file items)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Plaintext for text items, base64 for file items
    #[serde(default)]
    pub content: String,
}

impl Item {
    /// Create a new text item
    pub fn new_text(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            tags,
            kind: ItemKind::Text,
            created: now,
            modified: now,
            filename: None,
            size: None,
            content: content.into(),
        }
    }

    /// Create a new file item from raw bytes
    pub fn new_file(
        title: impl Into<String>,
        filename: impl Into<String>,
        data: &[u8],
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            tags,
            kind: ItemKind::File,
            created: now,
            modified: now,
            filename: Some(filename.into()),
            size: Some(data.len() as u64),
            content: STANDARD.encode(data),
        }
    }

    /// Build an item from file contents, choosing the kind by inspection
    ///
    /// Valid UTF-8 without NUL bytes becomes a text item, anything else a
    /// file item.
    pub fn from_file_contents(
        title: impl Into<String>,
        filename: impl Into<String>,
        data: &[u8],
        tags: Vec<String>,
    ) -> Self {
        match std::str::from_utf8(data) {
            Ok(text) if !data.contains(&0) => Self::new_text(title, text, tags),
            _ => Self::new_file(title, filename, data, tags),
        }
    }

    /// Update the modified timestamp to now
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Whether this item can be linked
    pub fn is_text(&self) -> bool {
        self.kind == ItemKind::Text
    }

    /// Case-insensitive tag match
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Decode the binary payload of a file item, checking the declared size
    pub fn decode_file(&self) -> DredgeResult<Vec<u8>> {
        if self.kind != ItemKind::File {
            return Err(DredgeError::InvalidInput(format!(
                "item is not a file item (type: {})",
                self.kind
            )));
        }

        let data = STANDARD
            .decode(self.content.trim())
            .map_err(|e| DredgeError::Corrupted(format!("Invalid file content encoding: {}", e)))?;

        if let Some(size) = self.size {
            if data.len() as u64 != size {
                return Err(DredgeError::Corrupted(format!(
                    "size mismatch: expected {} bytes, got {} bytes",
                    size,
                    data.len()
                )));
            }
        }

        Ok(data)
    }

    /// Validate the item
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.title.trim().is_empty() {
            return Err(ItemValidationError::EmptyTitle);
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ItemValidationError::EmptyTag);
        }

        if self.kind == ItemKind::File {
            match &self.filename {
                Some(name) if !name.trim().is_empty() => {}
                _ => return Err(ItemValidationError::MissingFilename),
            }
            if self.size.is_none() {
                return Err(ItemValidationError::MissingSize);
            }
        }

        Ok(())
    }
}

/// Validation errors for items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyTitle,
    EmptyTag,
    MissingFilename,
    MissingSize,
}

impl fmt::Display for ItemValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Item title cannot be empty"),
            Self::EmptyTag => write!(f, "Item tags cannot be empty strings"),
            Self::MissingFilename => write!(f, "File items must have a filename"),
            Self::MissingSize => write!(f, "File items must have a size"),
        }
    }
}

impl std::error::Error for ItemValidationError {}

impl From<ItemValidationError> for DredgeError {
    fn from(err: ItemValidationError) -> Self {
        DredgeError::InvalidInput(err.to_string())
    }
}
