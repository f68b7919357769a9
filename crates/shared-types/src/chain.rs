//! # Chain and Account Identifiers
//!
//! CAIP-2 chain references (`"<namespace>:<reference>"`, e.g. `eip155:1`)
//! and account identifiers (`"<chainRef>:<canonical address>"`).
//!
//! Both types are canonical by construction: the grammar is checked once,
//! when the value is parsed, and every later consumer can rely on it.

use crate::errors::{ErrorReason, WalletError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The EVM chain family namespace.
pub const EIP155: &str = "eip155";

/// A CAIP-2 chain reference.
///
/// Namespace: 3-8 lowercase alphanumerics or hyphens. Reference: 1-32
/// characters from `[-_a-zA-Z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainRef {
    namespace: String,
    reference: String,
}

impl ChainRef {
    /// Parse and validate a `"namespace:reference"` string.
    ///
    /// # Errors
    ///
    /// Returns `unknown-chain` when the string does not match the CAIP-2
    /// grammar.
    pub fn parse(value: &str) -> Result<Self, WalletError> {
        let (namespace, reference) = value.split_once(':').ok_or_else(|| {
            WalletError::new(
                ErrorReason::UnknownChain,
                format!("malformed chain reference: {value:?}"),
            )
        })?;

        if !is_valid_namespace(namespace) || !is_valid_reference(reference) {
            return Err(WalletError::new(
                ErrorReason::UnknownChain,
                format!("malformed chain reference: {value:?}"),
            ));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        })
    }

    /// Build an eip155 chain reference from a numeric chain id.
    #[must_use]
    pub fn eip155(chain_id: u64) -> Self {
        Self {
            namespace: EIP155.to_string(),
            reference: chain_id.to_string(),
        }
    }

    /// The chain family namespace (e.g. `eip155`).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The chain-specific reference (e.g. `1` for Ethereum mainnet).
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Whether this chain belongs to the EVM family.
    #[must_use]
    pub fn is_eip155(&self) -> bool {
        self.namespace == EIP155
    }

    /// The numeric chain id for eip155 chains, `None` otherwise.
    #[must_use]
    pub fn eip155_chain_id(&self) -> Option<u64> {
        if !self.is_eip155() {
            return None;
        }
        self.reference.parse().ok()
    }

    /// The numeric chain id as a 0x-prefixed hex string (eip155 only).
    #[must_use]
    pub fn eip155_hex_chain_id(&self) -> Option<String> {
        self.eip155_chain_id().map(|id| format!("0x{id:x}"))
    }
}

fn is_valid_namespace(s: &str) -> bool {
    (3..=8).contains(&s.len())
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_reference(s: &str) -> bool {
    (1..=32).contains(&s.len())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl FromStr for ChainRef {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ChainRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

/// A fully-qualified account identifier: chain reference plus canonical
/// address.
///
/// The address component is stored in its namespace-specific canonical form
/// (lowercased 0x-hex for eip155). Formatting for display is the chain
/// registry's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId {
    chain: ChainRef,
    address: String,
}

impl AccountId {
    /// Assemble from an already-canonical address.
    #[must_use]
    pub fn new(chain: ChainRef, canonical_address: impl Into<String>) -> Self {
        Self {
            chain,
            address: canonical_address.into(),
        }
    }

    /// Parse `"<namespace>:<reference>:<address>"`.
    ///
    /// # Errors
    ///
    /// Returns `invalid-address` when the trailing address component is
    /// missing, `unknown-chain` when the chain prefix is malformed.
    pub fn parse(value: &str) -> Result<Self, WalletError> {
        let mut parts = value.splitn(3, ':');
        let (ns, reference, address) = match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(r), Some(a)) if !a.is_empty() => (ns, r, a),
            _ => {
                return Err(WalletError::new(
                    ErrorReason::InvalidAddress,
                    format!("malformed account id: {value:?}"),
                ))
            }
        };
        let chain = ChainRef::parse(&format!("{ns}:{reference}"))?;
        Ok(Self {
            chain,
            address: address.to_string(),
        })
    }

    /// The chain this account lives on.
    #[must_use]
    pub fn chain(&self) -> &ChainRef {
        &self.chain
    }

    /// The canonical address component.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.address)
    }
}

impl FromStr for AccountId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
