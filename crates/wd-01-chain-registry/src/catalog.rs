//! Built-in chain catalog.
//!
//! Seeded into the registry store on first start; `wallet_addEthereumChain`
//! extends the set at runtime.

use shared_types::{ChainMetadata, ChainRef, NativeCurrency};

fn ether() -> NativeCurrency {
    NativeCurrency {
        name: "Ether".into(),
        symbol: "ETH".into(),
        decimals: 18,
    }
}

fn chain(
    id: u64,
    name: &str,
    currency: NativeCurrency,
    rpc: &str,
    explorer: &str,
) -> ChainMetadata {
    ChainMetadata {
        chain_ref: ChainRef::eip155(id),
        name: name.into(),
        native_currency: currency,
        rpc_urls: vec![rpc.into()],
        block_explorer_urls: vec![explorer.into()],
    }
}

/// The chains every fresh install knows about.
#[must_use]
pub fn known_chains() -> Vec<ChainMetadata> {
    vec![
        chain(
            1,
            "Ethereum Mainnet",
            ether(),
            "https://eth.llamarpc.com",
            "https://etherscan.io",
        ),
        chain(
            11_155_111,
            "Sepolia",
            NativeCurrency {
                name: "Sepolia Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
            "https://rpc.sepolia.org",
            "https://sepolia.etherscan.io",
        ),
        chain(
            137,
            "Polygon PoS",
            NativeCurrency {
                name: "POL".into(),
                symbol: "POL".into(),
                decimals: 18,
            },
            "https://polygon-rpc.com",
            "https://polygonscan.com",
        ),
        chain(
            10,
            "OP Mainnet",
            ether(),
            "https://mainnet.optimism.io",
            "https://optimistic.etherscan.io",
        ),
        chain(
            42_161,
            "Arbitrum One",
            ether(),
            "https://arb1.arbitrum.io/rpc",
            "https://arbiscan.io",
        ),
        chain(
            8453,
            "Base",
            ether(),
            "https://mainnet.base.org",
            "https://basescan.org",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_mainnet_first() {
        let chains = known_chains();
        assert_eq!(chains[0].chain_ref, ChainRef::eip155(1));
    }

    #[test]
    fn test_catalog_refs_are_unique() {
        let chains = known_chains();
        let mut refs: Vec<_> = chains.iter().map(|c| c.chain_ref.clone()).collect();
        refs.sort();
        refs.dedup();
        assert_eq!(refs.len(), chains.len());
    }

    #[test]
    fn test_catalog_urls_are_https() {
        for chain in known_chains() {
            for url in chain.rpc_urls.iter().chain(&chain.block_explorer_urls) {
                assert!(url.starts_with("https://"), "{url}");
            }
        }
    }
}
