//! # secp256k1 ECDSA
//!
//! Recoverable signatures over 32-byte prehashes, as the eip155 namespace
//! uses them: `v` is the raw recovery id (0/1); chain-specific adjustment
//! (EIP-155 `v = recid + 35 + 2*chain_id`) is the transaction assembler's
//! concern.

use crate::errors::CryptoError;
use crate::hashing::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

/// An ECDSA signature plus its recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id, 0 or 1.
    pub v: u8,
}

impl RecoverableSignature {
    /// The 65-byte `r || s || v` wire form used by `personal_sign` et al.,
    /// with `v` in the legacy 27/28 convention.
    #[must_use]
    pub fn to_rsv_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v + 27;
        out
    }
}

/// Sign a 32-byte prehash with a raw private key.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` for an out-of-range key and
/// `CryptoError::Signature` if signing fails.
pub fn sign_prehash(
    private_key: &[u8; 32],
    digest: &[u8; 32],
) -> Result<RecoverableSignature, CryptoError> {
    let signing_key =
        SigningKey::from_slice(private_key).map_err(|_| CryptoError::InvalidKey)?;
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::Signature(e.to_string()))?;

    let bytes = signature.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    Ok(RecoverableSignature {
        r,
        s,
        v: recovery_id.to_byte(),
    })
}

/// Recover the signer's address from a prehash and a recoverable
/// signature.
///
/// # Errors
///
/// Returns `CryptoError::Signature` when the signature does not recover.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<[u8; 20], CryptoError> {
    let mut raw = [0u8; 64];
    raw[..32].copy_from_slice(&signature.r);
    raw[32..].copy_from_slice(&signature.s);
    let parsed =
        Signature::from_slice(&raw).map_err(|e| CryptoError::Signature(e.to_string()))?;
    let recovery_id =
        RecoveryId::from_byte(signature.v).ok_or_else(|| {
            CryptoError::Signature(format!("invalid recovery id {}", signature.v))
        })?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &parsed, recovery_id)
        .map_err(|e| CryptoError::Signature(e.to_string()))?;
    Ok(address_of_verifying_key(&verifying_key))
}

/// The Ethereum address of a raw private key.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` for an out-of-range key.
pub fn address_of_private_key(private_key: &[u8; 32]) -> Result<[u8; 20], CryptoError> {
    let signing_key =
        SigningKey::from_slice(private_key).map_err(|_| CryptoError::InvalidKey)?;
    Ok(address_of_verifying_key(signing_key.verifying_key()))
}

fn address_of_verifying_key(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag; address = last 20 bytes of
    // keccak(x || y).
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}
