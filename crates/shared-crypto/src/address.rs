//! # Ethereum Address Forms
//!
//! Canonical form is lowercased 0x-hex. Display form is the EIP-55
//! mixed-case checksum. Mixed-case input must carry a valid checksum;
//! all-lower and all-upper input is accepted without one.

use crate::errors::CryptoError;
use crate::hashing::keccak256;

/// Canonicalize an eip155 address: validate and lowercase.
///
/// # Errors
///
/// Returns `CryptoError::InvalidLength` for a malformed length and
/// `CryptoError::Signature`-free validation errors as
/// `CryptoError::InvalidKey` for bad hex or a failed checksum.
pub fn canonicalize_eth_address(input: &str) -> Result<String, CryptoError> {
    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or(CryptoError::InvalidKey)?;
    if hex_part.len() != 40 {
        return Err(CryptoError::InvalidLength {
            expected: 40,
            actual: hex_part.len(),
        });
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidKey);
    }

    let lower = hex_part.to_ascii_lowercase();
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        // Mixed case is a checksum claim; verify it.
        let expected = checksum_body(&lower);
        if expected != hex_part {
            return Err(CryptoError::InvalidKey);
        }
    }

    Ok(format!("0x{lower}"))
}

/// Format a canonical address in EIP-55 mixed case.
///
/// The input is expected canonical (`0x` + 40 lowercase hex); pass
/// arbitrary input through [`canonicalize_eth_address`] first.
#[must_use]
pub fn checksum_eth_address(canonical: &str) -> String {
    let body = canonical.strip_prefix("0x").unwrap_or(canonical);
    format!("0x{}", checksum_body(body))
}

fn checksum_body(lower: &str) -> String {
    let digest = keccak256(lower.as_bytes());
    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (digest[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// Format a 20-byte address as its canonical string.
#[must_use]
pub fn address_to_canonical(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Vectors from the EIP-55 reference set.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_checksum_vectors() {
        for address in CHECKSUMMED {
            let canonical = address.to_ascii_lowercase();
            assert_eq!(&checksum_eth_address(&canonical), address);
        }
    }

    #[test]
    fn test_canonicalize_accepts_any_single_case() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let upper = format!("0x{}", lower[2..].to_ascii_uppercase());
        assert_eq!(canonicalize_eth_address(lower).unwrap(), lower);
        assert_eq!(canonicalize_eth_address(&upper).unwrap(), lower);
    }

    #[test]
    fn test_canonicalize_verifies_mixed_case() {
        assert_eq!(
            canonicalize_eth_address(CHECKSUMMED[0]).unwrap(),
            CHECKSUMMED[0].to_ascii_lowercase()
        );
        // Flip one checksum-significant letter.
        let bad = CHECKSUMMED[0].replace("Aeb", "aeb");
        assert!(canonicalize_eth_address(&bad).is_err());
    }

    #[test]
    fn test_canonicalize_rejects_malformed() {
        assert!(canonicalize_eth_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(canonicalize_eth_address("0x1234").is_err());
        assert!(canonicalize_eth_address("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
    }

    #[test]
    fn test_roundtrip_canonical_checksum_canonical() {
        let canonical = "0xdbf03b407c01e7cd3cbea99509d93f8dddc8c6fb";
        let formatted = checksum_eth_address(canonical);
        assert_eq!(canonicalize_eth_address(&formatted).unwrap(), canonical);
    }

    #[test]
    fn test_bytes_to_canonical() {
        let mut address = [0u8; 20];
        address[19] = 0xff;
        assert_eq!(
            address_to_canonical(&address),
            "0x00000000000000000000000000000000000000ff"
        );
    }
}
