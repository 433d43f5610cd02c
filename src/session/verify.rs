//! Password verification file
//!
//! `.dredge-key` is an envelope around a fixed marker string. Decrypting it
//! is the only way a password is ever checked; the session cache is never
//! consulted while testing a candidate.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::paths::create_private_dir;
use crate::crypto::{self, SecureString};
use crate::error::{DredgeError, DredgeResult};
use crate::storage::file_io::write_atomic;

use super::prompt::PasswordPrompt;
use super::Session;

/// Plaintext sealed inside the verification file
pub const VERIFICATION_CONTENT: &str = "dredge-vault-v1";

/// Access to the verification file
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    path: PathBuf,
}

impl PasswordVerifier {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a password has been set up
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Envelope bytes for a verification file under `password`
    pub fn seal(password: &str) -> DredgeResult<Vec<u8>> {
        if password.is_empty() {
            return Err(DredgeError::InvalidInput("password cannot be empty".into()));
        }
        crypto::encrypt(VERIFICATION_CONTENT.as_bytes(), password)
    }

    /// Write a fresh verification file
    pub fn create(&self, password: &str) -> DredgeResult<()> {
        let envelope = Self::seal(password)?;
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        write_atomic(&self.path, &envelope)
    }

    /// Check `password` against the verification file
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no verification file, `WrongPassword` if it
    /// does not decrypt, `Corrupted` if it decrypts to anything but the
    /// marker.
    pub fn verify(&self, password: &str) -> DredgeResult<()> {
        let envelope = fs::read(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DredgeError::NotFound {
                    entity_type: "Password verification file",
                    identifier: self.path.display().to_string(),
                }
            } else {
                DredgeError::io("Failed to read verification file", e)
            }
        })?;

        let marker = match crypto::decrypt_string(&envelope, password) {
            Ok(marker) => marker,
            Err(DredgeError::TooShort { .. }) | Err(DredgeError::WrongPassword) => {
                return Err(DredgeError::WrongPassword)
            }
            Err(e) => return Err(e),
        };

        if marker != VERIFICATION_CONTENT {
            return Err(DredgeError::Corrupted(
                "verification file does not contain the expected marker".into(),
            ));
        }
        Ok(())
    }
}

/// Obtain a password the vault accepts
///
/// A cached password that still verifies is returned directly; a stale one
/// is dropped from the cache. Otherwise the user is prompted. On a vault
/// without a verification file the entered password becomes the vault
/// password. Verified passwords are cached for the session.
pub fn get_password_with_verification(
    session: &Session,
    verifier: &PasswordVerifier,
    prompt: &mut dyn PasswordPrompt,
) -> DredgeResult<SecureString> {
    if let Some(cached) = session.get_cached_password()? {
        match verifier.verify(&cached) {
            Ok(()) => return Ok(cached),
            Err(e) => {
                info!(error = %e, "cached password no longer valid");
                session.clear_session()?;
            }
        }
    }

    let password = prompt.prompt("Password: ")?;
    if password.is_empty() {
        return Err(DredgeError::InvalidInput("password cannot be empty".into()));
    }

    if verifier.exists() {
        verifier.verify(&password)?;
    } else {
        verifier.create(&password)?;
        info!(path = %verifier.path().display(), "created password verification file");
    }

    if let Err(e) = session.cache_password(&password) {
        warn!(error = %e, "failed to cache password");
    }

    Ok(password)
}
