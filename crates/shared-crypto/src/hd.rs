//! # HD Derivation
//!
//! BIP-39 mnemonic handling and BIP-32 child-key derivation on the
//! standard Ethereum path `m/44'/60'/0'/0/<index>`, built directly on
//! HMAC-SHA-512 and secp256k1 scalar arithmetic.

use crate::errors::CryptoError;
use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::group::Curve as _;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field as _, PrimeField};
use k256::{ProjectivePoint, Scalar};
use sha2::Sha512;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

const HARDENED: u32 = 0x8000_0000;

/// The fixed derivation path prefix for eip155 accounts:
/// `m/44'/60'/0'/0`.
const ETH_PATH: [u32; 4] = [44 | HARDENED, 60 | HARDENED, HARDENED, 0];

/// Validate a BIP-39 phrase.
///
/// # Errors
///
/// Returns `CryptoError::InvalidMnemonic` with the parser's diagnosis.
pub fn validate_mnemonic(phrase: &str) -> Result<(), CryptoError> {
    Mnemonic::parse_normalized(phrase)
        .map(|_| ())
        .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))
}

/// Generate a fresh English mnemonic of 12 or 24 words.
///
/// # Errors
///
/// Returns `CryptoError::InvalidMnemonic` for any other word count.
pub fn generate_mnemonic(word_count: usize) -> Result<Zeroizing<String>, CryptoError> {
    let entropy_len = match word_count {
        12 => 16,
        24 => 32,
        other => {
            return Err(CryptoError::InvalidMnemonic(format!(
                "unsupported word count {other}; expected 12 or 24"
            )))
        }
    };
    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut entropy[..entropy_len]);
    let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_len])
        .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Derive the 64-byte BIP-39 seed from a phrase (empty passphrase).
///
/// # Errors
///
/// Returns `CryptoError::InvalidMnemonic` when the phrase fails
/// validation.
pub fn mnemonic_to_seed(phrase: &str) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed("")))
}

/// Derive the private key for `m/44'/60'/0'/0/<index>` from a BIP-39
/// seed.
///
/// Deterministic: the same seed and index always yield the same key, which
/// is what makes the account set reproducible from a derivation counter.
///
/// # Errors
///
/// Returns `CryptoError::InvalidDerivation` in the astronomically rare
/// case a child key falls outside the curve order.
pub fn derive_eth_private_key(
    seed: &[u8],
    index: u32,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if index >= HARDENED {
        return Err(CryptoError::InvalidDerivation { index });
    }

    let mut node = ExtendedKey::master(seed)?;
    for step in ETH_PATH {
        node = node.child(step)?;
    }
    node = node.child(index)?;

    Ok(Zeroizing::new(node.key_bytes()))
}

/// A BIP-32 extended private key: scalar plus chain code.
struct ExtendedKey {
    key: Scalar,
    chain_code: [u8; 32],
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self, CryptoError> {
        let output = hmac_sha512(b"Bitcoin seed", seed)?;
        Self::from_hmac_output(&output, 0)
    }

    fn child(&self, index: u32) -> Result<Self, CryptoError> {
        let mut data = Zeroizing::new([0u8; 37]);
        if index >= HARDENED {
            // 0x00 || ser256(k_par)
            data[1..33].copy_from_slice(&self.key.to_repr());
        } else {
            // serP(point(k_par))
            let point = (ProjectivePoint::GENERATOR * self.key)
                .to_affine()
                .to_encoded_point(true);
            data[..33].copy_from_slice(point.as_bytes());
        }
        data[33..].copy_from_slice(&index.to_be_bytes());

        let output = hmac_sha512(&self.chain_code, &data[..])?;
        let derived = Self::from_hmac_output(&output, index)?;
        let child_key = derived.key + self.key;
        if bool::from(child_key.is_zero()) {
            return Err(CryptoError::InvalidDerivation { index });
        }
        Ok(Self {
            key: child_key,
            chain_code: derived.chain_code,
        })
    }

    fn from_hmac_output(output: &[u8; 64], index: u32) -> Result<Self, CryptoError> {
        let (il, ir) = output.split_at(32);
        let mut repr = [0u8; 32];
        repr.copy_from_slice(il);

        let key = Option::<Scalar>::from(Scalar::from_repr(repr.into()))
            .ok_or(CryptoError::InvalidDerivation { index })?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        Ok(Self { key, chain_code })
    }

    fn key_bytes(&self) -> [u8; 32] {
        self.key.to_repr().into()
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], CryptoError> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|_| CryptoError::InvalidLength {
        expected: 32,
        actual: key.len(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
