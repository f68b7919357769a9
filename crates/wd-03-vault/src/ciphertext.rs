//! Ciphertext envelope codec.
//!
//! Binary fields are hex in the persisted row; decode validates every
//! field and reports `corrupt-ciphertext` rather than guessing.

use shared_types::{ErrorReason, Timestamp, VaultCiphertext, WalletError, PROTOCOL_VERSION,
    VAULT_ALGORITHM};

/// Decoded binary form of a persisted ciphertext.
#[derive(Debug)]
pub struct DecodedCiphertext {
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub iv: [u8; 12],
    pub cipher: Vec<u8>,
}

/// Assemble the persisted envelope from fresh binary parts.
#[must_use]
pub fn build(
    salt: &[u8],
    iterations: u32,
    iv: &[u8; 12],
    cipher: &[u8],
    now: Timestamp,
) -> VaultCiphertext {
    VaultCiphertext {
        version: PROTOCOL_VERSION,
        algorithm: VAULT_ALGORITHM.to_string(),
        salt: hex::encode(salt),
        iterations,
        iv: hex::encode(iv),
        cipher: hex::encode(cipher),
        created_at: now,
    }
}

/// Decode and validate a persisted envelope.
///
/// # Errors
///
/// `corrupt-ciphertext` for an unknown algorithm, bad hex, a wrong-sized
/// IV, an empty salt, or a zero iteration count.
pub fn decode(envelope: &VaultCiphertext) -> Result<DecodedCiphertext, WalletError> {
    if envelope.algorithm != VAULT_ALGORITHM {
        return Err(corrupt(format!(
            "unknown algorithm {:?}",
            envelope.algorithm
        )));
    }
    if envelope.iterations == 0 {
        return Err(corrupt("zero iteration count"));
    }

    let salt = hex::decode(&envelope.salt).map_err(|_| corrupt("salt is not hex"))?;
    if salt.is_empty() {
        return Err(corrupt("empty salt"));
    }

    let iv_bytes = hex::decode(&envelope.iv).map_err(|_| corrupt("iv is not hex"))?;
    let iv: [u8; 12] = iv_bytes
        .try_into()
        .map_err(|_| corrupt("iv must be 12 bytes"))?;

    let cipher = hex::decode(&envelope.cipher).map_err(|_| corrupt("cipher is not hex"))?;

    Ok(DecodedCiphertext {
        salt,
        iterations: envelope.iterations,
        iv,
        cipher,
    })
}

fn corrupt(detail: impl Into<String>) -> WalletError {
    WalletError::new(ErrorReason::CorruptCiphertext, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultCiphertext {
        build(&[1u8; 16], 600_000, &[2u8; 12], &[3u8; 48], 7)
    }

    #[test]
    fn test_build_decode_roundtrip() {
        let decoded = decode(&sample()).unwrap();
        assert_eq!(decoded.salt, vec![1u8; 16]);
        assert_eq!(decoded.iterations, 600_000);
        assert_eq!(decoded.iv, [2u8; 12]);
        assert_eq!(decoded.cipher, vec![3u8; 48]);
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        let mut envelope = sample();
        envelope.algorithm = "scrypt".into();
        assert_eq!(
            decode(&envelope).unwrap_err().reason,
            ErrorReason::CorruptCiphertext
        );
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut bad_iv = sample();
        bad_iv.iv = hex::encode([0u8; 16]);
        assert!(decode(&bad_iv).is_err());

        let mut bad_hex = sample();
        bad_hex.cipher = "zz".into();
        assert!(decode(&bad_hex).is_err());

        let mut bad_salt = sample();
        bad_salt.salt = String::new();
        assert!(decode(&bad_salt).is_err());

        let mut bad_iters = sample();
        bad_iters.iterations = 0;
        assert!(decode(&bad_iters).is_err());
    }
}
