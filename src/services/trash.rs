//! Trash service: soft delete and undo

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;
use crate::session::Session;
use crate::storage::Storage;

use super::link::LinkService;

/// Outcome of an undo
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// Restored IDs with their deletion time, when the sidecar had one
    pub restored: Vec<(ItemId, Option<DateTime<Utc>>)>,
    /// IDs that could not be restored, with the reason
    pub failed: Vec<(ItemId, String)>,
}

impl UndoReport {
    pub fn restored_ids(&self) -> Vec<ItemId> {
        self.restored.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Service for trashing and restoring items
pub struct TrashService<'a> {
    storage: &'a Storage,
    session: &'a Session,
}

impl<'a> TrashService<'a> {
    pub fn new(storage: &'a Storage, session: &'a Session) -> Self {
        Self { storage, session }
    }

    /// Move items to the trash and remember them for undo
    ///
    /// Linked items are synced and unlinked first. Processing stops at the
    /// first failure; items trashed up to that point stay recorded.
    pub fn remove(&self, ids: &[&str], password: &str) -> DredgeResult<Vec<ItemId>> {
        let ids = ids
            .iter()
            .map(|id| ItemId::parse(id))
            .collect::<DredgeResult<Vec<_>>>()?;
        let _lock = self.storage.lock()?;

        let links = LinkService::new(self.storage);
        let mut trashed = Vec::with_capacity(ids.len());
        let mut result = Ok(());

        for id in ids {
            if let Err(e) = self.trash_one(&links, &id, password) {
                result = Err(e);
                break;
            }
            trashed.push(id);
        }

        if !trashed.is_empty() {
            if let Err(e) = self.session.record_deleted(&trashed) {
                warn!(error = %e, "failed to record deleted IDs for undo");
            }
        }

        result.map(|()| trashed)
    }

    fn trash_one(&self, links: &LinkService<'_>, id: &ItemId, password: &str) -> DredgeResult<()> {
        self.storage.items.require(id)?;
        self.storage.trash.ensure_slot_free(id)?;

        if links.is_linked(id) {
            match links.unlink_unlocked(id, Some(password)) {
                Ok(()) | Err(DredgeError::NothingToCleanUp(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.storage.trash.move_to_trash(id)?;
        info!(item = %id, "moved item to trash");
        Ok(())
    }

    /// Restore the first `count` recently deleted items (all when 0)
    pub fn undo(&self, count: usize) -> DredgeResult<UndoReport> {
        let all = self.session.deleted(0)?;
        if all.is_empty() {
            return Err(DredgeError::NotFound {
                entity_type: "Recent deletion",
                identifier: "nothing to undo".into(),
            });
        }
        let _lock = self.storage.lock()?;

        let wanted = if count == 0 { all.len() } else { count.min(all.len()) };
        let mut report = UndoReport::default();

        for id in &all[..wanted] {
            let deleted_at = self.storage.trash.info(id).ok().map(|info| info.deleted_at);
            match self.storage.trash.restore_from_trash(id) {
                Ok(()) => {
                    info!(item = %id, "restored item from trash");
                    report.restored.push((id.clone(), deleted_at));
                }
                Err(e) => {
                    warn!(item = %id, error = %e, "failed to restore item");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        let pending: Vec<ItemId> = all
            .into_iter()
            .filter(|id| !report.restored.iter().any(|(done, _)| done == id))
            .collect();
        self.session.set_pending_deleted(&pending)?;

        Ok(report)
    }
}
