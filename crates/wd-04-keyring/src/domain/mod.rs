//! Keyring domain: keyring families, payload codec, signing payloads.

pub mod eip191;
pub mod eip712;
pub mod keyrings;
pub mod payload;

pub use keyrings::{HdKeyring, Keyring, PrivateKeyKeyring};
