//! Per-namespace address canonicalization and formatting.
//!
//! Canonical form is what gets stored and compared; display form is what
//! crosses back to callers. `canonicalize(format(canonical)) == canonical`
//! holds for every supported namespace.

use shared_crypto::{canonicalize_eth_address, checksum_eth_address};
use shared_types::{ChainRef, ErrorReason, WalletError};

/// Canonicalize an address for a chain's namespace.
///
/// For eip155 this lowercases and validates (including the EIP-55
/// checksum when the input is mixed-case).
///
/// # Errors
///
/// `invalid-address` for malformed input, `not-compatible` for a
/// namespace this core has no address codec for.
pub fn canonicalize_address(chain: &ChainRef, input: &str) -> Result<String, WalletError> {
    if !chain.is_eip155() {
        return Err(unsupported_namespace(chain));
    }
    canonicalize_eth_address(input).map_err(|e| {
        WalletError::new(
            ErrorReason::InvalidAddress,
            format!("invalid eip155 address {input:?}: {e}"),
        )
    })
}

/// Format a canonical address for display.
///
/// # Errors
///
/// `not-compatible` for an unsupported namespace.
pub fn format_address(chain: &ChainRef, canonical: &str) -> Result<String, WalletError> {
    if !chain.is_eip155() {
        return Err(unsupported_namespace(chain));
    }
    Ok(checksum_eth_address(canonical))
}

fn unsupported_namespace(chain: &ChainRef) -> WalletError {
    WalletError::new(
        ErrorReason::NotCompatible,
        format!("no address codec for namespace {:?}", chain.namespace()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_canonical_format_canonical() {
        let chain = ChainRef::eip155(1);
        let canonical = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        let display = format_address(&chain, canonical).unwrap();
        assert_ne!(display, canonical); // mixed case
        assert_eq!(canonicalize_address(&chain, &display).unwrap(), canonical);
    }

    #[test]
    fn test_case_insensitive_equivalence() {
        let chain = ChainRef::eip155(1);
        let canonical = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        let upper = format!("0x{}", canonical[2..].to_ascii_uppercase());
        assert_eq!(canonicalize_address(&chain, &upper).unwrap(), canonical);
    }

    #[test]
    fn test_roundtrip_holds_for_random_addresses() {
        use rand::RngCore;
        let chain = ChainRef::eip155(1);
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let mut raw = [0u8; 20];
            rng.fill_bytes(&mut raw);
            let canonical = format!("0x{}", hex::encode(raw));

            let display = format_address(&chain, &canonical).unwrap();
            assert_eq!(canonicalize_address(&chain, &display).unwrap(), canonical);
            // Any casing that canonicalizes equals the display form
            // case-insensitively.
            assert_eq!(display.to_ascii_lowercase(), canonical);
        }
    }

    #[test]
    fn test_unknown_namespace_not_compatible() {
        let chain = ChainRef::parse("solana:mainnet").unwrap();
        let err = canonicalize_address(&chain, "whatever").unwrap_err();
        assert_eq!(err.reason, shared_types::ErrorReason::NotCompatible);
    }

    #[test]
    fn test_malformed_address_rejected() {
        let chain = ChainRef::eip155(1);
        let err = canonicalize_address(&chain, "0x1234").unwrap_err();
        assert_eq!(err.reason, shared_types::ErrorReason::InvalidAddress);
    }
}
