//! dredge - encrypted storage for secrets, credentials and config files
//!
//! Every item lives in its own Argon2id + AES-256-GCM envelope. Text items
//! can be linked onto the filesystem: a symlink points at a private
//! plaintext projection, and edits made through the link flow back into the
//! vault on the next read.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and settings
//! - `crypto`: Key derivation and envelope encryption
//! - `error`: Custom error types
//! - `models`: Items and item IDs
//! - `session`: Per-terminal password cache and password verification
//! - `storage`: Item files, link manifest, spawned files, trash and locking
//! - `services`: Business logic layer
//! - `cli`, `display`: Command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use dredge::config::DredgePaths;
//! use dredge::models::Item;
//! use dredge::services::ItemService;
//! use dredge::storage::Storage;
//!
//! let storage = Storage::open(DredgePaths::new()?)?;
//! let id = ItemService::new(&storage)
//!     .create(None, Item::new_text("SSH Config", "Host github.com", vec![]), "pw")?;
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

pub use error::{DredgeError, DredgeResult};
