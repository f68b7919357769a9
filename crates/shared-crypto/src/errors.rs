//! Crypto error type.
//!
//! Kept separate from the wallet domain error: callers decide which domain
//! reason a primitive failure maps to (a failed AEAD open is
//! `invalid-password` to the vault, `corrupt-ciphertext` to a migration).

use thiserror::Error;

/// Errors surfaced by the crypto primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD decryption failed (wrong key or tampered ciphertext).
    #[error("decryption failed")]
    DecryptionFailed,

    /// The mnemonic phrase failed BIP-39 validation.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// A private key was out of range or malformed.
    #[error("invalid private key")]
    InvalidKey,

    /// A derived child key was invalid for its curve (probability ~2^-127).
    #[error("derivation produced an invalid key at index {index}")]
    InvalidDerivation { index: u32 },

    /// Signature creation or parsing failed.
    #[error("signature error: {0}")]
    Signature(String),

    /// An input had the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
