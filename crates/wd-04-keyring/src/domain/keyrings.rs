//! The two keyring families.
//!
//! An HD keyring re-derives its accounts from the mnemonic and a counter,
//! so the account set is reproducible from the persisted payload. A
//! private-key keyring wraps exactly one imported secret. All secret
//! buffers zero on drop.

use shared_crypto::{
    address_of_private_key, derive_eth_private_key, mnemonic_to_seed, sign_prehash,
    RecoverableSignature,
};
use shared_types::{ErrorReason, KeyringKind, WalletError, WalletResult};
use uuid::Uuid;
use zeroize::Zeroizing;

fn address_string(key: &[u8; 32]) -> WalletResult<String> {
    let address = address_of_private_key(key).map_err(|_| {
        WalletError::new(ErrorReason::InvalidPrivateKey, "private key is not on the curve")
    })?;
    Ok(shared_crypto::address::address_to_canonical(&address))
}

/// One derived HD account held in memory.
#[derive(Debug)]
struct DerivedAccount {
    index: u32,
    address: String,
    private_key: Zeroizing<[u8; 32]>,
}

/// A mnemonic-backed keyring with sequential derivation.
#[derive(Debug)]
pub struct HdKeyring {
    id: Uuid,
    namespace: String,
    mnemonic: Zeroizing<String>,
    seed: Zeroizing<[u8; 64]>,
    accounts: Vec<DerivedAccount>,
}

impl HdKeyring {
    /// Build from a phrase and re-derive the first `count` accounts.
    ///
    /// # Errors
    ///
    /// `invalid-mnemonic` when the phrase fails BIP-39 validation;
    /// derivation errors surface as `internal`.
    pub fn restore(
        id: Uuid,
        namespace: impl Into<String>,
        mnemonic: &str,
        count: u32,
    ) -> WalletResult<Self> {
        let seed = mnemonic_to_seed(mnemonic).map_err(|e| {
            WalletError::new(ErrorReason::InvalidMnemonic, e.to_string())
        })?;
        let mut keyring = Self {
            id,
            namespace: namespace.into(),
            mnemonic: Zeroizing::new(mnemonic.to_string()),
            seed,
            accounts: Vec::new(),
        };
        for _ in 0..count {
            keyring.derive_next()?;
        }
        Ok(keyring)
    }

    /// Derive the account at the current counter and advance it.
    ///
    /// Deterministic: index `n` always yields the same address for the
    /// same mnemonic.
    pub fn derive_next(&mut self) -> WalletResult<(u32, String)> {
        let index = self.accounts.len() as u32;
        let private_key = derive_eth_private_key(&self.seed[..], index)
            .map_err(|e| WalletError::internal(format!("derivation failed: {e}")))?;
        let address = address_string(&private_key)?;
        self.accounts.push(DerivedAccount {
            index,
            address: address.clone(),
            private_key,
        });
        Ok((index, address))
    }

    /// The address the next `derive_next` call will produce, without
    /// advancing the counter. Lets callers run duplicate checks first.
    pub fn preview_next(&self) -> WalletResult<String> {
        let index = self.accounts.len() as u32;
        let private_key = derive_eth_private_key(&self.seed[..], index)
            .map_err(|e| WalletError::internal(format!("derivation failed: {e}")))?;
        address_string(&private_key)
    }

    /// How many accounts are derived.
    #[must_use]
    pub fn derivation_index(&self) -> u32 {
        self.accounts.len() as u32
    }

    /// The mnemonic, for the password-guarded export flow.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }
}

/// A keyring wrapping one imported private key.
#[derive(Debug)]
pub struct PrivateKeyKeyring {
    id: Uuid,
    namespace: String,
    address: String,
    private_key: Zeroizing<[u8; 32]>,
}

impl PrivateKeyKeyring {
    /// Import a raw 32-byte key.
    ///
    /// # Errors
    ///
    /// `invalid-private-key` for a wrong length, the zero key, or a value
    /// outside the curve order.
    pub fn import(
        id: Uuid,
        namespace: impl Into<String>,
        key_bytes: &[u8],
    ) -> WalletResult<Self> {
        let private_key: [u8; 32] = key_bytes.try_into().map_err(|_| {
            WalletError::new(
                ErrorReason::InvalidPrivateKey,
                format!("private key must be 32 bytes, got {}", key_bytes.len()),
            )
        })?;
        if private_key == [0u8; 32] {
            return Err(WalletError::new(
                ErrorReason::InvalidPrivateKey,
                "private key must be non-zero",
            ));
        }
        let address = address_string(&private_key)?;
        Ok(Self {
            id,
            namespace: namespace.into(),
            address,
            private_key: Zeroizing::new(private_key),
        })
    }
}

/// Either keyring family, uniformly addressable.
pub enum Keyring {
    Hd(HdKeyring),
    PrivateKey(PrivateKeyKeyring),
}

impl Keyring {
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Hd(k) => k.id,
            Self::PrivateKey(k) => k.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> KeyringKind {
        match self {
            Self::Hd(_) => KeyringKind::Hd,
            Self::PrivateKey(_) => KeyringKind::PrivateKey,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Hd(k) => &k.namespace,
            Self::PrivateKey(k) => &k.namespace,
        }
    }

    /// Canonical addresses, in derivation order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        match self {
            Self::Hd(k) => k.accounts.iter().map(|a| a.address.clone()).collect(),
            Self::PrivateKey(k) => vec![k.address.clone()],
        }
    }

    #[must_use]
    pub fn contains(&self, canonical_address: &str) -> bool {
        match self {
            Self::Hd(k) => k.accounts.iter().any(|a| a.address == canonical_address),
            Self::PrivateKey(k) => k.address == canonical_address,
        }
    }

    /// Sign a 32-byte prehash with the key owning `canonical_address`.
    ///
    /// # Errors
    ///
    /// `account-not-found` when the address is not in this keyring.
    pub fn sign_prehash(
        &self,
        canonical_address: &str,
        digest: &[u8; 32],
    ) -> WalletResult<RecoverableSignature> {
        let key = self.private_key_of(canonical_address)?;
        sign_prehash(key, digest)
            .map_err(|e| WalletError::internal(format!("signing failed: {e}")))
    }

    /// The hex-encoded private key for the export flow.
    ///
    /// # Errors
    ///
    /// `account-not-found` when the address is not in this keyring.
    pub fn export_private_key(
        &self,
        canonical_address: &str,
    ) -> WalletResult<Zeroizing<String>> {
        let key = self.private_key_of(canonical_address)?;
        Ok(Zeroizing::new(format!("0x{}", hex::encode(&key[..]))))
    }

    /// The derivation index of an HD account, `None` for imports.
    #[must_use]
    pub fn derivation_index_of(&self, canonical_address: &str) -> Option<u32> {
        match self {
            Self::Hd(k) => k
                .accounts
                .iter()
                .find(|a| a.address == canonical_address)
                .map(|a| a.index),
            Self::PrivateKey(_) => None,
        }
    }

    /// The payload entry persisting this keyring through the vault.
    #[must_use]
    pub fn payload_entry(&self) -> crate::domain::payload::PayloadEntry {
        use crate::domain::payload::PayloadEntry;
        match self {
            Self::Hd(k) => PayloadEntry {
                id: k.id,
                kind: KeyringKind::Hd,
                namespace: k.namespace.clone(),
                mnemonic: Some(k.mnemonic.to_string()),
                private_key: None,
                derivation_index: Some(k.derivation_index()),
            },
            Self::PrivateKey(k) => PayloadEntry {
                id: k.id,
                kind: KeyringKind::PrivateKey,
                namespace: k.namespace.clone(),
                mnemonic: None,
                private_key: Some(hex::encode(&k.private_key[..])),
                derivation_index: None,
            },
        }
    }

    fn private_key_of(&self, canonical_address: &str) -> WalletResult<&[u8; 32]> {
        let key = match self {
            Self::Hd(k) => k
                .accounts
                .iter()
                .find(|a| a.address == canonical_address)
                .map(|a| &*a.private_key),
            Self::PrivateKey(k) => {
                (k.address == canonical_address).then_some(&*k.private_key)
            }
        };
        key.ok_or_else(|| {
            WalletError::new(
                ErrorReason::AccountNotFound,
                format!("no account {canonical_address} in keyring"),
            )
        })
    }
}
