//! Item CLI commands
//!
//! Implements CLI commands for adding, viewing, editing, removing and
//! exporting items.

use std::io::Read;
use std::path::PathBuf;

use clap::Subcommand;

use crate::display::{format_item_details, format_item_line, format_item_list, format_undo_report};
use crate::error::{DredgeError, DredgeResult};
use crate::models::{Item, ItemId};
use crate::services::{ItemService, LinkService, TrashService};

use super::Context;

/// Item subcommands
#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add a text item (content from --content or stdin)
    Add {
        /// Item title
        title: String,
        /// Item content; read from stdin when omitted
        #[arg(short, long)]
        content: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Use this ID instead of a random one
        #[arg(long)]
        id: Option<String>,
    },
    /// Import a file as an item
    AddFile {
        /// File to import
        path: PathBuf,
        /// Item title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Show an item
    #[command(alias = "cat")]
    View {
        /// Item ID
        id: String,
    },
    /// List items
    #[command(alias = "ls")]
    List {
        /// Only items carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Edit an item's title, tags or content
    Edit {
        /// Item ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Option<Vec<String>>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Move items to the trash
    Rm {
        /// Item IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Restore recently removed items
    Undo {
        /// How many to restore (all when omitted)
        count: Option<usize>,
    },
    /// Give an item a new ID
    Mv {
        /// Current ID
        old: String,
        /// New ID
        new: String,
    },
    /// Write a file item back to disk
    Export {
        /// Item ID
        id: String,
        /// Destination file or directory
        #[arg(default_value = ".")]
        dest: PathBuf,
    },
}

/// Handle an item command
pub fn handle_item_command(ctx: &Context, cmd: ItemCommands) -> DredgeResult<()> {
    let service = ItemService::new(&ctx.storage);

    match cmd {
        ItemCommands::Add {
            title,
            content,
            tags,
            id,
        } => {
            let content = match content {
                Some(content) => content,
                None => read_stdin()?,
            };
            let password = ctx.unlock()?;
            let item = Item::new_text(title, content, tags);
            let id = service.create(id.as_deref(), item.clone(), &password)?;
            println!("+ {}", format_item_line(&id, &item, None));
        }

        ItemCommands::AddFile { path, title, tags } => {
            let password = ctx.unlock()?;
            let id = service.add_file(title.as_deref(), &path, tags, &password)?;
            let item = service.read(id.as_str(), &password)?;
            println!("+ {}", format_item_line(&id, &item, None));
        }

        ItemCommands::View { id } => {
            let password = ctx.unlock()?;
            let item = service.read_and_reconcile(&id, &password)?;
            let id = ItemId::parse(&id)?;
            let link = LinkService::new(&ctx.storage).get_linked_path(&id);
            print!("{}", format_item_details(&id, &item, link.as_deref()));
        }

        ItemCommands::List { tag } => {
            let password = ctx.unlock()?;
            let links = LinkService::new(&ctx.storage);
            let rows: Vec<_> = service
                .list(&password)?
                .into_iter()
                .filter(|(_, item)| tag.as_deref().map_or(true, |t| item.has_tag(t)))
                .map(|(id, item)| {
                    let link = links.get_linked_path(&id);
                    (id, item, link)
                })
                .collect();
            print!("{}", format_item_list(&rows));
        }

        ItemCommands::Edit {
            id,
            title,
            tags,
            content,
        } => {
            if title.is_none() && tags.is_none() && content.is_none() {
                println!("No changes specified. Use --title, --tag or --content.");
                return Ok(());
            }

            let password = ctx.unlock()?;
            let mut item = service.read_and_reconcile(&id, &password)?;
            if let Some(title) = title {
                item.title = title;
            }
            if let Some(tags) = tags {
                item.tags = tags;
            }
            if let Some(content) = content {
                if !item.is_text() {
                    return Err(DredgeError::InvalidInput(
                        "cannot set text content on a file item".into(),
                    ));
                }
                item.content = content;
            }

            let item = service.update(&id, item, &password)?;
            println!("~ {}", format_item_line(&ItemId::parse(&id)?, &item, None));
        }

        ItemCommands::Rm { ids } => {
            let password = ctx.unlock()?;
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let trashed = TrashService::new(&ctx.storage, &ctx.session).remove(&ids, &password)?;
            for id in trashed {
                println!("- [{}]", id);
            }
        }

        ItemCommands::Undo { count } => {
            let report = TrashService::new(&ctx.storage, &ctx.session).undo(count.unwrap_or(0))?;
            print!("{}", format_undo_report(&report));
        }

        ItemCommands::Mv { old, new } => {
            let password = ctx.unlock()?;
            let new = service.rename(&old, &new, &password)?;
            println!("Renamed [{}] -> [{}]", old, new);
        }

        ItemCommands::Export { id, dest } => {
            let password = ctx.unlock()?;
            let written = service.export_file(&id, &dest, &password)?;
            println!("Exported [{}] -> {}", id, written.display());
        }
    }

    Ok(())
}

fn read_stdin() -> DredgeResult<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| DredgeError::io("Failed to read content from stdin", e))?;
    Ok(content)
}
