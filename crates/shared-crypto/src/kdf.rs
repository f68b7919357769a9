//! Password key derivation.
//!
//! PBKDF2-SHA-256 with a fixed iteration count; the vault stores the count
//! alongside the ciphertext so future increases stay decryptable.

use crate::aead::SecretKey;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// PBKDF2 iteration count for freshly-created vaults.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM IV length in bytes.
pub const IV_LEN: usize = 12;

/// Derive the 256-bit vault key from a password.
#[must_use]
pub fn derive_vault_key(password: &str, salt: &[u8], iterations: u32) -> SecretKey {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    SecretKey::from_bytes(out)
}

/// A fresh random salt.
#[must_use]
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// A fresh random AES-GCM IV.
#[must_use]
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}
