//! Cryptographic functions for dredge
//!
//! Argon2id key derivation feeding AES-256-GCM, packed into self-contained
//! binary envelopes (salt and nonce travel with the ciphertext).

pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use encryption::{decrypt, decrypt_string, encrypt, MIN_ENVELOPE_SIZE, NONCE_SIZE, TAG_SIZE};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams, SALT_SIZE};
pub use secure_memory::SecureString;
