//! End-to-end tests for the dredge binary.
//!
//! Each test gets its own data root through `DREDGE_DATA_DIR`, which also
//! keeps the session cache out of the shared temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn dredge(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dredge").unwrap();
    cmd.env("DREDGE_DATA_DIR", temp.path().join("data"));
    cmd.env_remove("DREDGE_PASSWORD");
    cmd.env_remove("DREDGE_NEW_PASSWORD");
    cmd.current_dir(temp.path());
    cmd
}

fn add(temp: &TempDir, id: &str, title: &str, content: &str) {
    dredge(temp)
        .args(["--password", "pw", "add", title, "--id", id, "--content", content])
        .assert()
        .success();
}

#[test]
fn test_add_and_view() {
    let temp = TempDir::new().unwrap();

    dredge(&temp)
        .args([
            "--password",
            "pw",
            "add",
            "SSH Config",
            "--id",
            "abc",
            "--content",
            "Host github.com",
            "--tag",
            "ssh",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[abc] SSH Config #ssh"));

    assert!(temp.path().join("data/dredge/.dredge-key").is_file());
    assert!(temp.path().join("data/dredge/items/abc").is_file());

    dredge(&temp)
        .args(["--password", "pw", "view", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Host github.com"));
}

#[test]
fn test_wrong_password_is_rejected() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "t", "c");

    dredge(&temp)
        .args(["--password", "nope", "view", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong password"));
}

#[test]
fn test_password_spaces_are_significant() {
    let temp = TempDir::new().unwrap();
    dredge(&temp)
        .args(["--password", " pw ", "add", "t", "--id", "abc", "--content", "c"])
        .assert()
        .success();

    dredge(&temp)
        .env("DREDGE_PASSWORD", " pw ")
        .args(["view", "abc"])
        .assert()
        .success();

    dredge(&temp)
        .args(["--password", "pw", "view", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong password"));
}

#[test]
fn test_content_from_stdin() {
    let temp = TempDir::new().unwrap();

    dredge(&temp)
        .args(["--password", "pw", "add", "Notes", "--id", "nts"])
        .write_stdin("line one\nline two\n")
        .assert()
        .success();

    dredge(&temp)
        .args(["--password", "pw", "view", "nts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("line one\nline two"));
}

#[test]
fn test_duplicate_id_fails() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "first", "1");

    dredge(&temp)
        .args(["--password", "pw", "add", "second", "--id", "abc", "--content", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_list_filters_by_tag() {
    let temp = TempDir::new().unwrap();
    dredge(&temp)
        .args(["--password", "pw", "add", "Work", "--id", "wrk", "--content", "x", "-t", "job"])
        .assert()
        .success();
    add(&temp, "hom", "Home", "y");

    dredge(&temp)
        .args(["--password", "pw", "list", "--tag", "job"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[wrk] Work"))
        .stdout(predicate::str::contains("[hom]").not());
}

#[test]
fn test_edit_updates_item() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "Old", "before");

    dredge(&temp)
        .args(["--password", "pw", "edit", "abc", "--title", "New", "--content", "after"])
        .assert()
        .success();

    dredge(&temp)
        .args(["--password", "pw", "view", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[abc] New"))
        .stdout(predicate::str::contains("after"));
}

#[test]
fn test_rm_and_undo() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "t", "c");

    dredge(&temp)
        .args(["--password", "pw", "rm", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- [abc]"));

    assert!(!temp.path().join("data/dredge/items/abc").exists());
    assert!(temp.path().join("data/Trash/files/dredge-abc").is_file());
    assert!(temp
        .path()
        .join("data/Trash/info/dredge-abc.trashinfo")
        .is_file());

    dredge(&temp)
        .args(["undo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ [abc]"));

    assert!(temp.path().join("data/dredge/items/abc").is_file());

    dredge(&temp).args(["undo"]).assert().failure();
}

#[cfg(unix)]
#[test]
fn test_link_edit_and_unlink() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "SSH Config", "A");
    let target = temp.path().join("config");

    dredge(&temp)
        .args(["--password", "pw", "link", "abc"])
        .arg(&target)
        .assert()
        .success();

    assert!(fs::symlink_metadata(&target)
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(fs::read_to_string(&target).unwrap(), "A");

    // Edit through the link, then read back through the vault
    fs::write(&target, "B").unwrap();
    dredge(&temp)
        .args(["--password", "pw", "view", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B"))
        .stdout(predicate::str::contains(target.display().to_string()));

    dredge(&temp)
        .args(["--password", "pw", "link", "abc"])
        .arg(temp.path().join("other"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    dredge(&temp)
        .args(["--password", "pw", "unlink", "abc"])
        .assert()
        .success();
    assert!(fs::symlink_metadata(&target).is_err());

    dredge(&temp)
        .args(["--password", "pw", "unlink", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_add_file_and_export() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("key.bin");
    fs::write(&source, [0u8, 1, 2, 3, 255]).unwrap();

    let output = dredge(&temp)
        .args(["--password", "pw", "add-file"])
        .arg(&source)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let line = String::from_utf8(output).unwrap();
    let id = line
        .split('[')
        .nth(1)
        .and_then(|rest| rest.split(']').next())
        .unwrap()
        .to_string();

    let out_dir = temp.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    dredge(&temp)
        .args(["--password", "pw", "export", &id])
        .arg(&out_dir)
        .assert()
        .success();

    assert_eq!(
        fs::read(out_dir.join("key.bin")).unwrap(),
        vec![0u8, 1, 2, 3, 255]
    );

    dredge(&temp)
        .args(["--password", "pw", "export", &id])
        .arg(&out_dir)
        .assert()
        .failure();
}

#[test]
fn test_mv_renames_item() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "t", "c");

    dredge(&temp)
        .args(["--password", "pw", "mv", "abc", "xyz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[abc] -> [xyz]"));

    dredge(&temp)
        .args(["--password", "pw", "view", "xyz"])
        .assert()
        .success();
}

#[test]
fn test_passwd_rotates() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "t", "secret");

    dredge(&temp)
        .args(["--password", "pw", "passwd", "--new-password", "pw2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Re-encrypted 1 item(s)"));

    dredge(&temp)
        .args(["--password", "pw", "view", "abc"])
        .assert()
        .failure();

    dredge(&temp)
        .args(["--password", "pw2", "view", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("secret"));
}

#[test]
fn test_status_without_password() {
    let temp = TempDir::new().unwrap();

    dredge(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized: No"));

    add(&temp, "abc", "t", "c");

    dredge(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Items:       1"));
}

#[test]
fn test_heal_removes_stray_spawned_file() {
    let temp = TempDir::new().unwrap();
    add(&temp, "abc", "t", "c");
    let stray = temp.path().join("data/dredge/.spawned/zzz");
    fs::write(&stray, "leftover").unwrap();

    dredge(&temp)
        .arg("heal")
        .assert()
        .success();
    assert!(!stray.exists());

    dredge(&temp)
        .arg("heal")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean up."));
}
