//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod item;
pub mod link;
pub mod vault;

pub use item::{handle_item_command, ItemCommands};
pub use link::{handle_link_command, LinkCommands};
pub use vault::{handle_vault_command, VaultCommands};

use tracing::warn;

use crate::config::paths::DredgePaths;
use crate::crypto::SecureString;
use crate::error::DredgeResult;
use crate::session::{
    get_password_with_verification, PasswordVerifier, ScriptedPrompt, Session, TerminalPrompt,
};
use crate::storage::Storage;

/// Everything a command handler needs
pub struct Context {
    pub storage: Storage,
    pub session: Session,
    /// Password given on the command line or through the environment
    password: Option<SecureString>,
}

impl Context {
    /// Open the vault and the terminal's session
    pub fn open(paths: DredgePaths, password: Option<String>) -> DredgeResult<Self> {
        let session = Session::for_current_terminal(&paths);
        let storage = Storage::open(paths)?;
        Ok(Self {
            storage,
            session,
            password: password.map(SecureString::from),
        })
    }

    pub fn verifier(&self) -> PasswordVerifier {
        PasswordVerifier::new(self.storage.paths().verify_file())
    }

    /// Password given up front, if any
    pub fn explicit_password(&self) -> Option<&SecureString> {
        self.password.as_ref()
    }

    /// A password the vault accepts
    ///
    /// An explicit password is checked on its own, ignoring whatever the
    /// session has cached, and becomes the cached password on success.
    pub fn unlock(&self) -> DredgeResult<SecureString> {
        let verifier = self.verifier();
        match &self.password {
            Some(explicit) => {
                let mut prompt = ScriptedPrompt::new([explicit.clone()]);
                let password =
                    get_password_with_verification(&Session::in_memory(), &verifier, &mut prompt)?;
                if let Err(e) = self.session.cache_password(&password) {
                    warn!(error = %e, "failed to cache password");
                }
                Ok(password)
            }
            None => get_password_with_verification(&self.session, &verifier, &mut TerminalPrompt),
        }
    }
}
