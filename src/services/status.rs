//! Vault status summary

use std::path::PathBuf;

use crate::error::DredgeResult;
use crate::models::ItemId;
use crate::session::Session;
use crate::storage::Storage;

/// Snapshot of the vault for `dredge status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStatus {
    pub vault_dir: PathBuf,
    pub initialized: bool,
    pub item_count: usize,
    pub trashed_count: usize,
    pub links: Vec<(ItemId, PathBuf)>,
    pub active_session: bool,
}

/// Gather the status without asking for a password
pub fn status(storage: &Storage, session: &Session) -> DredgeResult<VaultStatus> {
    let links = storage
        .links
        .load()?
        .iter()
        .map(|(id, entry)| (id.clone(), entry.path.clone()))
        .collect();

    Ok(VaultStatus {
        vault_dir: storage.paths().vault_dir(),
        initialized: storage.is_initialized(),
        item_count: storage.items.list_ids()?.len(),
        trashed_count: storage.trash.list_ids()?.len(),
        links,
        active_session: session.has_active_session(),
    })
}
