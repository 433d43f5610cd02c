//! Password rotation
//!
//! Every item is re-encrypted into a staging directory, then the staging
//! directory and the verification file are swapped in with renames. Until
//! the swap the live vault is untouched; if the swap fails half way the old
//! directory is renamed back. A backup left behind by an earlier run is only
//! dealt with after the current password has been verified, and is only
//! deleted once every item it holds is present in the live directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::paths::create_private_dir;
use crate::error::{DredgeError, DredgeResult};
use crate::models::{Item, ItemId};
use crate::session::{PasswordVerifier, Session};
use crate::storage::file_io::{remove_dir_if_exists, remove_if_exists, write_atomic, write_new};
use crate::storage::items::{list_ids_in, open_item, restore_backup_dir, seal_item};
use crate::storage::Storage;

/// Outcome of a rotation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Live items re-encrypted
    pub items: usize,
    /// Trashed items re-encrypted
    pub trashed: usize,
    /// Trashed items left under the old password
    pub trash_failures: Vec<ItemId>,
}

/// Change the vault password from `current` to `new`
pub fn rotate(
    storage: &Storage,
    session: &Session,
    current: &str,
    new: &str,
) -> DredgeResult<RotationReport> {
    rotate_with(storage, session, current, new, |from, to| fs::rename(from, to))
}

/// Rotation with the directory rename step supplied by the caller
pub fn rotate_with<F>(
    storage: &Storage,
    session: &Session,
    current: &str,
    new: &str,
    mut rename: F,
) -> DredgeResult<RotationReport>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    if new.is_empty() {
        return Err(DredgeError::InvalidInput("new password cannot be empty".into()));
    }
    if new == current {
        return Err(DredgeError::InvalidInput(
            "new password must differ from the current one".into(),
        ));
    }

    let _lock = storage.lock()?;
    let paths = storage.paths();
    let items_dir = paths.items_dir();
    let tmp_dir = paths.items_tmp_dir();
    let old_dir = paths.items_old_dir();
    let verify_file = paths.verify_file();
    let verify_tmp = sibling(&verify_file, "tmp");
    let verify_old = sibling(&verify_file, "old");

    PasswordVerifier::new(verify_file.clone()).verify(current)?;

    if restore_backup_dir(&items_dir, &old_dir)? {
        warn!(backup = %old_dir.display(), "restored items from an interrupted rotation");
    }

    let ids = storage.items.list_ids()?;
    let items = ids
        .iter()
        .map(|id| storage.items.load_raw(id, current).map(|item| (id, item)))
        .collect::<DredgeResult<Vec<_>>>()?;

    discard_stale_backup(&old_dir, &ids)?;
    remove_dir_if_exists(&tmp_dir)?;
    remove_if_exists(&verify_tmp)?;
    remove_if_exists(&verify_old)?;

    write_atomic(&verify_tmp, &PasswordVerifier::seal(new)?)?;

    if !items.is_empty() {
        if let Err(e) = stage_items(&tmp_dir, &items, new) {
            let _ = remove_dir_if_exists(&tmp_dir);
            let _ = remove_if_exists(&verify_tmp);
            return Err(e);
        }
        if let Err(e) = swap(&mut rename, &items_dir, &tmp_dir, &old_dir) {
            let _ = remove_if_exists(&verify_tmp);
            return Err(e);
        }
    }

    if let Err(e) = swap_file(&mut rename, &verify_file, &verify_tmp, &verify_old) {
        if !items.is_empty() {
            roll_back_items(&mut rename, &items_dir, &tmp_dir, &old_dir)?;
        }
        return Err(e);
    }

    remove_dir_if_exists(&old_dir)?;
    remove_if_exists(&verify_old)?;

    let mut report = RotationReport {
        items: items.len(),
        ..Default::default()
    };
    reencrypt_trash(storage, current, new, &mut report);

    if let Err(e) = session.cache_password(new) {
        warn!(error = %e, "failed to cache new password");
    }

    info!(items = report.items, trashed = report.trashed, "rotated vault password");
    Ok(report)
}

/// Drop an `items.old/` left by an earlier run once the live directory is
/// known to be complete
///
/// Complete means every live item opened under the current password (the
/// caller has already checked that) and every backed-up ID is live. Anything
/// else keeps both directories and asks for a manual fix.
fn discard_stale_backup(old_dir: &Path, live: &[ItemId]) -> DredgeResult<()> {
    if !old_dir.is_dir() {
        return Ok(());
    }

    let missing: Vec<ItemId> = list_ids_in(old_dir)?
        .into_iter()
        .filter(|id| !live.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(DredgeError::InconsistentState(format!(
            "{} holds {} item(s) missing from the live vault ({}); \
             move them back into {} before changing the password",
            old_dir.display(),
            missing.len(),
            missing
                .iter()
                .map(ItemId::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            old_dir.with_file_name("items").display()
        )));
    }

    info!(backup = %old_dir.display(), "removing stale rotation backup");
    remove_dir_if_exists(old_dir)?;
    Ok(())
}

fn stage_items(tmp_dir: &Path, items: &[(&ItemId, Item)], new: &str) -> DredgeResult<()> {
    create_private_dir(tmp_dir)?;
    for (id, item) in items {
        write_new(tmp_dir.join(id.as_str()), &seal_item(item, new)?)?;
    }

    let staged = list_ids_in(tmp_dir)?.len();
    if staged != items.len() {
        return Err(DredgeError::InconsistentState(format!(
            "staged {} of {} items, rotation aborted",
            staged,
            items.len()
        )));
    }
    Ok(())
}

/// `items` -> `items.old`, then `items.tmp` -> `items`
fn swap<F>(rename: &mut F, live: &Path, staged: &Path, backup: &Path) -> DredgeResult<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    if let Err(e) = rename(live, backup) {
        let _ = remove_dir_if_exists(staged);
        return Err(DredgeError::io("Failed to move items aside", e));
    }

    if let Err(e) = rename(staged, live) {
        if let Err(back) = rename(backup, live) {
            return Err(DredgeError::InconsistentState(format!(
                "could not install re-encrypted items ({}) nor restore the backup ({}); \
                 your items are in {}",
                e,
                back,
                backup.display()
            )));
        }
        let _ = remove_dir_if_exists(staged);
        return Err(DredgeError::io("Failed to install re-encrypted items", e));
    }

    Ok(())
}

/// Same rename dance for the verification file
fn swap_file<F>(rename: &mut F, live: &Path, staged: &Path, backup: &Path) -> DredgeResult<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    if let Err(e) = rename(live, backup) {
        let _ = remove_if_exists(staged);
        return Err(DredgeError::io("Failed to move verification file aside", e));
    }

    if let Err(e) = rename(staged, live) {
        if let Err(back) = rename(backup, live) {
            return Err(DredgeError::InconsistentState(format!(
                "could not install the new verification file ({}) nor restore it ({}); \
                 the old one is at {}",
                e,
                back,
                backup.display()
            )));
        }
        let _ = remove_if_exists(staged);
        return Err(DredgeError::io("Failed to install verification file", e));
    }

    Ok(())
}

/// Put the old items back after the verification swap failed
fn roll_back_items<F>(rename: &mut F, live: &Path, discard: &Path, backup: &Path) -> DredgeResult<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let restored = rename(live, discard).and_then(|()| rename(backup, live));
    match restored {
        Ok(()) => {
            let _ = remove_dir_if_exists(discard);
            Ok(())
        }
        Err(e) => Err(DredgeError::InconsistentState(format!(
            "items are encrypted with the new password but the verification file was not \
             updated, and rolling back failed ({}); old items are in {}",
            e,
            backup.display()
        ))),
    }
}

fn reencrypt_trash(storage: &Storage, current: &str, new: &str, report: &mut RotationReport) {
    let ids = match storage.trash.list_ids() {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "could not list trash for re-encryption");
            return;
        }
    };

    for id in ids {
        let path = storage.trash.file_path(&id);
        let result = fs::read(&path)
            .map_err(|e| DredgeError::io("Failed to read trashed item", e))
            .and_then(|envelope| open_item(&envelope, current))
            .and_then(|item| seal_item(&item, new))
            .and_then(|envelope| write_atomic(&path, &envelope));

        match result {
            Ok(()) => report.trashed += 1,
            Err(e) => {
                warn!(item = %id, error = %e, "trashed item keeps the old password");
                report.trash_failures.push(id);
            }
        }
    }
}

fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::DredgePaths;
    use crate::services::{ItemService, TrashService};
    use tempfile::TempDir;

    fn setup(ids: &[&str]) -> (TempDir, Storage, Session) {
        let temp_dir = TempDir::new().unwrap();
        let paths = DredgePaths::with_base_dir(temp_dir.path().join("data"));
        let storage = Storage::open(paths).unwrap();
        PasswordVerifier::new(storage.paths().verify_file())
            .create("old")
            .unwrap();
        for id in ids {
            ItemService::new(&storage)
                .create(Some(id), Item::new_text(*id, "secret", vec![]), "old")
                .unwrap();
        }
        (temp_dir, storage, Session::in_memory())
    }

    fn verifier(storage: &Storage) -> PasswordVerifier {
        PasswordVerifier::new(storage.paths().verify_file())
    }

    #[test]
    fn test_rotate_reencrypts_everything() {
        let (_tmp, storage, session) = setup(&["aaa", "bbb"]);

        let report = rotate(&storage, &session, "old", "new").unwrap();
        assert_eq!(report.items, 2);

        let items = ItemService::new(&storage);
        assert_eq!(items.read("aaa", "new").unwrap().content, "secret");
        assert!(matches!(items.read("aaa", "old"), Err(DredgeError::WrongPassword)));
        assert!(verifier(&storage).verify("new").is_ok());
        assert_eq!(session.get_cached_password().unwrap().unwrap().as_str(), "new");

        assert!(!storage.paths().items_tmp_dir().exists());
        assert!(!storage.paths().items_old_dir().exists());
    }

    #[test]
    fn test_rotate_rejects_bad_input() {
        let (_tmp, storage, session) = setup(&["aaa"]);

        assert!(matches!(
            rotate(&storage, &session, "old", "old"),
            Err(DredgeError::InvalidInput(_))
        ));
        assert!(matches!(
            rotate(&storage, &session, "old", ""),
            Err(DredgeError::InvalidInput(_))
        ));
        assert!(matches!(
            rotate(&storage, &session, "wrong", "new"),
            Err(DredgeError::WrongPassword)
        ));
        assert!(verifier(&storage).verify("old").is_ok());
    }

    #[test]
    fn test_rotate_empty_vault_swaps_verification_only() {
        let (_tmp, storage, session) = setup(&[]);

        let report = rotate(&storage, &session, "old", "new").unwrap();
        assert_eq!(report.items, 0);
        assert!(verifier(&storage).verify("new").is_ok());
    }

    #[test]
    fn test_undecryptable_item_aborts_before_writing() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        ItemService::new(&storage)
            .create(Some("bad"), Item::new_text("t", "c", vec![]), "other")
            .unwrap();

        assert!(rotate(&storage, &session, "old", "new").is_err());
        assert!(!storage.paths().items_tmp_dir().exists());
        assert!(verifier(&storage).verify("old").is_ok());
        assert!(ItemService::new(&storage).read("aaa", "old").is_ok());
    }

    #[test]
    fn test_failed_install_restores_backup() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let mut calls = 0;

        let err = rotate_with(&storage, &session, "old", "new", |from, to| {
            calls += 1;
            if calls == 2 {
                Err(io::Error::new(io::ErrorKind::Other, "simulated"))
            } else {
                fs::rename(from, to)
            }
        })
        .unwrap_err();
        assert!(matches!(err, DredgeError::Io(_)));

        assert!(ItemService::new(&storage).read("aaa", "old").is_ok());
        assert!(verifier(&storage).verify("old").is_ok());
        assert!(!storage.paths().items_tmp_dir().exists());
        assert!(!storage.paths().items_old_dir().exists());
        assert!(!session.has_active_session());
    }

    #[test]
    fn test_failed_restore_reports_backup_location() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let mut calls = 0;

        let err = rotate_with(&storage, &session, "old", "new", |from, to| {
            calls += 1;
            if calls >= 2 {
                Err(io::Error::new(io::ErrorKind::Other, "simulated"))
            } else {
                fs::rename(from, to)
            }
        })
        .unwrap_err();

        match err {
            DredgeError::InconsistentState(msg) => assert!(msg.contains("items.old")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(storage.paths().items_old_dir().is_dir());

        // The next rotation recovers the backup before doing anything else
        rotate(&storage, &session, "old", "new").unwrap();
        assert_eq!(
            ItemService::new(&storage).read("aaa", "new").unwrap().content,
            "secret"
        );
    }

    #[test]
    fn test_backup_survives_reopen_and_wrong_password() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let paths = storage.paths().clone();
        let mut calls = 0;

        let err = rotate_with(&storage, &session, "old", "new", |from, to| {
            calls += 1;
            if calls >= 2 {
                Err(io::Error::new(io::ErrorKind::Other, "simulated"))
            } else {
                fs::rename(from, to)
            }
        })
        .unwrap_err();
        assert!(matches!(err, DredgeError::InconsistentState(_)));
        drop(storage);

        // A fresh process puts the backup back before anything else
        let storage = Storage::open(paths.clone()).unwrap();
        assert!(!paths.items_old_dir().exists());

        assert!(matches!(
            rotate(&storage, &session, "WRONG", "new"),
            Err(DredgeError::WrongPassword)
        ));
        assert_eq!(
            ItemService::new(&storage).read("aaa", "old").unwrap().content,
            "secret"
        );

        rotate(&storage, &session, "old", "new").unwrap();
        assert_eq!(
            ItemService::new(&storage).read("aaa", "new").unwrap().content,
            "secret"
        );
    }

    #[test]
    fn test_wrong_password_leaves_pending_backup() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let paths = storage.paths().clone();
        fs::rename(paths.items_dir(), paths.items_old_dir()).unwrap();
        fs::create_dir(paths.items_dir()).unwrap();

        assert!(matches!(
            rotate(&storage, &session, "WRONG", "new"),
            Err(DredgeError::WrongPassword)
        ));
        assert!(paths.items_old_dir().join("aaa").is_file());
    }

    #[test]
    fn test_stale_complete_backup_is_discarded() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let paths = storage.paths().clone();
        fs::create_dir(paths.items_old_dir()).unwrap();
        fs::copy(
            paths.items_dir().join("aaa"),
            paths.items_old_dir().join("aaa"),
        )
        .unwrap();

        rotate(&storage, &session, "old", "new").unwrap();
        assert!(!paths.items_old_dir().exists());
        assert!(ItemService::new(&storage).read("aaa", "new").is_ok());
    }

    #[test]
    fn test_backup_with_missing_items_blocks_rotation() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let paths = storage.paths().clone();
        fs::create_dir(paths.items_old_dir()).unwrap();
        fs::copy(
            paths.items_dir().join("aaa"),
            paths.items_old_dir().join("zzz"),
        )
        .unwrap();

        match rotate(&storage, &session, "old", "new") {
            Err(DredgeError::InconsistentState(msg)) => assert!(msg.contains("zzz")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(paths.items_old_dir().join("zzz").is_file());
        assert!(ItemService::new(&storage).read("aaa", "old").is_ok());
        assert!(verifier(&storage).verify("old").is_ok());
    }

    #[test]
    fn test_failed_verification_swap_rolls_items_back() {
        let (_tmp, storage, session) = setup(&["aaa"]);
        let mut calls = 0;

        let err = rotate_with(&storage, &session, "old", "new", |from, to| {
            calls += 1;
            if calls == 3 {
                Err(io::Error::new(io::ErrorKind::Other, "simulated"))
            } else {
                fs::rename(from, to)
            }
        })
        .unwrap_err();
        assert!(matches!(err, DredgeError::Io(_)));

        assert!(ItemService::new(&storage).read("aaa", "old").is_ok());
        assert!(verifier(&storage).verify("old").is_ok());
    }

    #[test]
    fn test_trashed_items_follow_the_new_password() {
        let (_tmp, storage, session) = setup(&["aaa", "bbb"]);
        TrashService::new(&storage, &session)
            .remove(&["bbb"], "old")
            .unwrap();

        let report = rotate(&storage, &session, "old", "new").unwrap();
        assert_eq!(report.items, 1);
        assert_eq!(report.trashed, 1);

        TrashService::new(&storage, &session).undo(0).unwrap();
        assert!(ItemService::new(&storage).read("bbb", "new").is_ok());
    }
}
