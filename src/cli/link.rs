//! Link CLI commands

use std::path::PathBuf;

use clap::Subcommand;

use crate::error::{DredgeError, DredgeResult};
use crate::models::ItemId;
use crate::services::LinkService;

use super::Context;

/// Link subcommands
#[derive(Subcommand)]
pub enum LinkCommands {
    /// Expose a text item at a path through a symlink
    Link {
        /// Item ID
        id: String,
        /// Where the symlink should live
        target: PathBuf,
        /// Replace an existing file at the target
        #[arg(short, long)]
        force: bool,
    },
    /// Remove an item's symlink, keeping the item
    Unlink {
        /// Item ID
        id: String,
    },
}

/// Handle a link command
pub fn handle_link_command(ctx: &Context, cmd: LinkCommands) -> DredgeResult<()> {
    let service = LinkService::new(&ctx.storage);

    match cmd {
        LinkCommands::Link { id, target, force } => {
            let id = ItemId::parse(&id)?;
            let target = std::path::absolute(&target).map_err(|e| {
                DredgeError::io(format!("Failed to resolve {}", target.display()), e)
            })?;
            let password = ctx.unlock()?;
            service.link(&id, &target, force, &password)?;
            println!("Linked [{}] -> {}", id, target.display());
        }

        LinkCommands::Unlink { id } => {
            let id = ItemId::parse(&id)?;
            let password = ctx.unlock()?;
            service.unlink(&id, &password)?;
            println!("Unlinked [{}]", id);
        }
    }

    Ok(())
}
