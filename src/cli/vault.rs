//! Vault-wide CLI commands: password change, status and self-heal

use clap::Subcommand;

use crate::crypto::SecureString;
use crate::display::{format_heal_report, format_rotation_report, format_status};
use crate::error::{DredgeError, DredgeResult};
use crate::services::{heal, rotate, status};
use crate::session::{prompt_new_password, PasswordPrompt, TerminalPrompt};

use super::Context;

/// Vault subcommands
#[derive(Subcommand)]
pub enum VaultCommands {
    /// Change the vault password
    Passwd {
        /// New password (prompted twice when omitted)
        #[arg(long, env = "DREDGE_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },
    /// Show vault status
    Status,
    /// Remove orphaned links and spawned files
    Heal,
}

/// Handle a vault command
pub fn handle_vault_command(ctx: &Context, cmd: VaultCommands) -> DredgeResult<()> {
    match cmd {
        VaultCommands::Passwd { new_password } => {
            if !ctx.storage.is_initialized() {
                return Err(DredgeError::NotFound {
                    entity_type: "Vault password",
                    identifier: "run 'dredge add' to create the vault first".into(),
                });
            }

            let current = match ctx.explicit_password() {
                Some(password) => password.clone(),
                None => TerminalPrompt.prompt("Current password: ")?,
            };
            let new = match new_password {
                Some(password) => SecureString::from(password),
                None => prompt_new_password(&mut TerminalPrompt)?,
            };

            let report = rotate(&ctx.storage, &ctx.session, &current, &new)?;
            print!("{}", format_rotation_report(&report));
        }

        VaultCommands::Status => {
            let report = status(&ctx.storage, &ctx.session)?;
            print!("{}", format_status(&report));
        }

        VaultCommands::Heal => {
            let report = heal::run(&ctx.storage)?;
            print!("{}", format_heal_report(&report));
        }
    }

    Ok(())
}
