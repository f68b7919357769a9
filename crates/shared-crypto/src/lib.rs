//! # Shared Crypto - Primitives for the Warden Wallet Core
//!
//! Everything the core signs, seals, or derives goes through this crate:
//!
//! - **Key derivation**: PBKDF2-SHA-256 (vault password -> symmetric key)
//! - **Sealing**: AES-256-GCM over the vault payload
//! - **Hashing**: keccak-256, sha-256
//! - **Signing**: secp256k1 ECDSA with recovery (eip155 namespace)
//! - **HD derivation**: BIP-39 mnemonics, BIP-32 child keys on the
//!   standard Ethereum path
//! - **Addresses**: EIP-55 checksum formatting and validation
//!
//! Secret material lives in zeroize-on-drop buffers and never crosses this
//! crate's boundary except through explicit byte accessors.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod address;
pub mod aead;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod hd;
pub mod kdf;

pub use aead::{open, seal, SecretKey};
pub use address::{canonicalize_eth_address, checksum_eth_address};
pub use ecdsa::{address_of_private_key, recover_address, sign_prehash, RecoverableSignature};
pub use errors::CryptoError;
pub use hashing::{keccak256, sha256};
pub use hd::{derive_eth_private_key, generate_mnemonic, mnemonic_to_seed, validate_mnemonic};
pub use kdf::{derive_vault_key, random_iv, random_salt, PBKDF2_ITERATIONS};
