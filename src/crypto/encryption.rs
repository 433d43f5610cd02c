//! Password-based AES-256-GCM envelopes
//!
//! Binary layout: `salt (16B) || nonce (12B) || ciphertext || tag (16B)`.
//! Salt and nonce are generated fresh on every call, so encrypting the same
//! plaintext twice never produces the same bytes.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::error::{DredgeError, DredgeResult};

use super::key_derivation::{derive_key, generate_salt, SALT_SIZE};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Smallest well-formed envelope (empty plaintext)
pub const MIN_ENVELOPE_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;

/// Borrowed view of the three regions of an envelope
struct EnvelopeParts<'a> {
    salt: &'a [u8],
    nonce: &'a [u8],
    ciphertext: &'a [u8],
}

impl<'a> EnvelopeParts<'a> {
    fn split(envelope: &'a [u8]) -> DredgeResult<Self> {
        if envelope.len() < MIN_ENVELOPE_SIZE {
            return Err(DredgeError::TooShort {
                len: envelope.len(),
                min: MIN_ENVELOPE_SIZE,
            });
        }

        let (salt, rest) = envelope.split_at(SALT_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        Ok(Self {
            salt,
            nonce,
            ciphertext,
        })
    }
}

/// Encrypt plaintext under a password-derived key
pub fn encrypt(plaintext: &[u8], password: &str) -> DredgeResult<Vec<u8>> {
    if password.is_empty() {
        return Err(DredgeError::InvalidInput(
            "password cannot be empty".to_string(),
        ));
    }

    let salt = generate_salt();
    let key = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DredgeError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| DredgeError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope with a password
///
/// Fails with [`DredgeError::TooShort`] for truncated input and
/// [`DredgeError::WrongPassword`] when the tag does not verify.
pub fn decrypt(envelope: &[u8], password: &str) -> DredgeResult<Vec<u8>> {
    let parts = EnvelopeParts::split(envelope)?;
    let key = derive_key(password, parts.salt)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DredgeError::Encryption(format!("Failed to create cipher: {}", e)))?;

    cipher
        .decrypt(Nonce::from_slice(parts.nonce), parts.ciphertext)
        .map_err(|_| DredgeError::WrongPassword)
}

/// Decrypt to a UTF-8 string
pub fn decrypt_string(envelope: &[u8], password: &str) -> DredgeResult<String> {
    let plaintext = decrypt(envelope, password)?;
    String::from_utf8(plaintext)
        .map_err(|e| DredgeError::Corrupted(format!("Invalid UTF-8 in decrypted data: {}", e)))
}
