//! Key derivation using Argon2id
//!
//! Every envelope carries its own random salt, so a key is derived per
//! encryption call and never stored.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{DredgeError, DredgeResult};

/// Size of the per-envelope salt in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Length of the derived key (AES-256)
pub const KEY_SIZE: usize = 32;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Parallel lanes
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 64 * 1024, // 64 MiB
            time_cost: 1,
            parallelism: 4,
        }
    }
}

/// A derived encryption key, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

/// Generate a fresh random salt
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a 32-byte key from a password and salt.
///
/// Deterministic for a given (password, salt) pair.
pub fn derive_key(password: &str, salt: &[u8]) -> DredgeResult<DerivedKey> {
    derive_key_with(password, salt, &KeyDerivationParams::default())
}

/// Derive a key with explicit cost parameters
pub fn derive_key_with(
    password: &str,
    salt: &[u8],
    params: &KeyDerivationParams,
) -> DredgeResult<DerivedKey> {
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| DredgeError::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = DerivedKey {
        key: [0u8; KEY_SIZE],
    };
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key.key)
        .map_err(|e| DredgeError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = KeyDerivationParams::default();
        assert_eq!(params.memory_cost, 65536);
        assert_eq!(params.time_cost, 1);
        assert_eq!(params.parallelism, 4);
    }

    #[test]
    fn test_same_password_same_salt_same_key() {
        let salt = generate_salt();
        let key1 = derive_key("test_password", &salt).unwrap();
        let key2 = derive_key("test_password", &salt).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = generate_salt();
        let key1 = derive_key("password1", &salt).unwrap();
        let key2 = derive_key("password2", &salt).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("same_password", &generate_salt()).unwrap();
        let key2 = derive_key("same_password", &generate_salt()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
