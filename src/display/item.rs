//! Item display formatting
//!
//! Formats items for terminal output in list and detail views.

use std::path::{Path, PathBuf};

use crate::models::{Item, ItemId, ItemKind};
use crate::services::{HealReport, RotationReport, UndoReport, VaultStatus};

/// One-line summary: `[id] title #tag #tag -> /link/target`
pub fn format_item_line(id: &ItemId, item: &Item, link: Option<&Path>) -> String {
    let mut line = format!("[{}] {}", id, item.title);

    if item.kind == ItemKind::File {
        line.push_str(" (file)");
    }
    for tag in &item.tags {
        line.push_str(" #");
        line.push_str(tag);
    }
    if let Some(target) = link {
        line.push_str(&format!(" -> {}", target.display()));
    }
    line
}

/// Format a list of items, one per line
pub fn format_item_list(rows: &[(ItemId, Item, Option<PathBuf>)]) -> String {
    if rows.is_empty() {
        return "No items found.\n".to_string();
    }

    let mut output = String::new();
    for (id, item, link) in rows {
        output.push_str(&format_item_line(id, item, link.as_deref()));
        output.push('\n');
    }
    output
}

/// Format a single item's metadata and, for text items, its content
pub fn format_item_details(id: &ItemId, item: &Item, link: Option<&Path>) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", format_item_line(id, item, link)));
    output.push_str(&format!(
        "  Created:  {}\n",
        item.created.format("%Y-%m-%d %H:%M")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        item.modified.format("%Y-%m-%d %H:%M")
    ));

    match item.kind {
        ItemKind::Text => {
            output.push('\n');
            output.push_str(&item.content);
            if !item.content.ends_with('\n') {
                output.push('\n');
            }
        }
        ItemKind::File => {
            output.push_str(&format!(
                "  Filename: {}\n",
                item.filename.as_deref().unwrap_or("-")
            ));
            if let Some(size) = item.size {
                output.push_str(&format!("  Size:     {} bytes\n", size));
            }
            output.push_str(&format!("\nUse 'dredge export {}' to write it to disk.\n", id));
        }
    }

    output
}

pub fn format_undo_report(report: &UndoReport) -> String {
    let mut output = String::new();
    for (id, deleted_at) in &report.restored {
        match deleted_at {
            Some(at) => output.push_str(&format!(
                "+ [{}] (deleted {})\n",
                id,
                at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            )),
            None => output.push_str(&format!("+ [{}]\n", id)),
        }
    }
    for (id, reason) in &report.failed {
        output.push_str(&format!("! [{}] {}\n", id, reason));
    }
    output
}

pub fn format_heal_report(report: &HealReport) -> String {
    if report.is_empty() {
        return "Nothing to clean up.\n".to_string();
    }

    let mut output = String::new();
    for id in &report.unlinked {
        output.push_str(&format!("Removed orphaned link for [{}]\n", id));
    }
    for name in &report.removed_spawned {
        output.push_str(&format!("Removed orphaned spawned file {}\n", name));
    }
    output
}

pub fn format_rotation_report(report: &RotationReport) -> String {
    let mut output = format!(
        "Password changed. Re-encrypted {} item(s)",
        report.items
    );
    if report.trashed > 0 {
        output.push_str(&format!(" and {} trashed item(s)", report.trashed));
    }
    output.push_str(".\n");

    if !report.trash_failures.is_empty() {
        output.push_str("Trashed items still under the old password:\n");
        for id in &report.trash_failures {
            output.push_str(&format!("  [{}]\n", id));
        }
    }
    output
}

/// Format the vault status block
pub fn format_status(status: &VaultStatus) -> String {
    let mut output = String::new();

    output.push_str(&format!("Vault:       {}\n", status.vault_dir.display()));
    output.push_str(&format!(
        "Initialized: {}\n",
        if status.initialized { "Yes" } else { "No" }
    ));
    output.push_str(&format!("Items:       {}\n", status.item_count));
    output.push_str(&format!("In trash:    {}\n", status.trashed_count));
    output.push_str(&format!(
        "Session:     {}\n",
        if status.active_session { "active" } else { "locked" }
    ));

    if !status.links.is_empty() {
        output.push_str("\nLinks:\n");
        for (id, path) in &status.links {
            output.push_str(&format!("  [{}] -> {}\n", id, path.display()));
        }
    }
    output
}
