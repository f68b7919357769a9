//! The keyring application service.
//!
//! Bridges the vault session to the in-memory account set: hydrates on
//! unlock, wipes on lock, persists only ciphertext through the vault, and
//! delegates signing to the domain keyrings.

use crate::domain::eip191::personal_message_digest;
use crate::domain::eip712::{typed_data_digest, TypedData};
use crate::domain::payload::{self, KeyringPayload};
use crate::domain::{HdKeyring, Keyring, PrivateKeyKeyring};
use crate::topics::ACCOUNTS_CHANGED;
use parking_lot::Mutex;
use shared_bus::{Messenger, SubscriptionHandle};
use shared_crypto::{canonicalize_eth_address, RecoverableSignature};
use shared_types::{
    AccountId, AccountRecord, ChainRef, ErrorReason, KeyringKind, KeyringMeta, TimeSource,
    WalletError, WalletResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wd_02_storage::{AccountsStore, KeyringMetaStore};
use wd_03_vault::topics::{VAULT_LOCKED, VAULT_UNLOCKED};
use wd_03_vault::VaultService;
use zeroize::Zeroizing;

#[derive(Default)]
struct State {
    /// Ordered as persisted; payload round-trips preserve order.
    keyrings: Vec<Keyring>,
    /// canonical address -> (namespace, keyring id)
    address_index: HashMap<String, (String, Uuid)>,
}

/// HD + private-key keyrings behind the vault session.
pub struct KeyringService {
    vault: Arc<VaultService>,
    accounts: Arc<dyn AccountsStore>,
    metas: Arc<dyn KeyringMetaStore>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    state: Mutex<State>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl KeyringService {
    pub fn new(
        vault: Arc<VaultService>,
        accounts: Arc<dyn AccountsStore>,
        metas: Arc<dyn KeyringMetaStore>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            vault,
            accounts,
            metas,
            messenger,
            time,
            state: Mutex::new(State::default()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Wire vault-session subscriptions: hydrate on unlock, wipe on lock.
    pub fn start(self: &Arc<Self>) {
        let on_unlock = {
            let service = Arc::clone(self);
            self.messenger.subscribe(&VAULT_UNLOCKED, move |_| service.hydrate())
        };
        let on_lock = {
            let service = Arc::clone(self);
            self.messenger.subscribe(&VAULT_LOCKED, move |_reason| {
                service.wipe();
                Ok(())
            })
        };
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.push(on_unlock);
        subscriptions.push(on_lock);
    }

    /// Unsubscribe and wipe. Part of runtime teardown.
    pub fn destroy(&self) {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
        self.wipe();
    }

    /// Rebuild the in-memory keyrings from the decrypted payload.
    ///
    /// HD keyrings re-derive their first `derivation_index` accounts, so
    /// the account set is reproducible from the snapshot alone.
    pub fn hydrate(&self) -> WalletResult<()> {
        let plaintext = self.vault.decrypt()?;
        let decoded = payload::decode(&plaintext);

        let mut keyrings = Vec::with_capacity(decoded.entries.len());
        for entry in &decoded.entries {
            let restored = match entry.kind {
                KeyringKind::Hd => entry
                    .mnemonic
                    .as_deref()
                    .ok_or_else(|| {
                        WalletError::new(ErrorReason::InvalidMnemonic, "hd entry without mnemonic")
                    })
                    .and_then(|mnemonic| {
                        HdKeyring::restore(
                            entry.id,
                            entry.namespace.clone(),
                            mnemonic,
                            entry.derivation_index.unwrap_or(0),
                        )
                    })
                    .map(Keyring::Hd),
                KeyringKind::PrivateKey => entry
                    .private_key
                    .as_deref()
                    .ok_or_else(|| {
                        WalletError::new(
                            ErrorReason::InvalidPrivateKey,
                            "private-key entry without key",
                        )
                    })
                    .and_then(|hex_key| {
                        let bytes = Zeroizing::new(hex::decode(hex_key).map_err(|_| {
                            WalletError::new(
                                ErrorReason::InvalidPrivateKey,
                                "private key is not hex",
                            )
                        })?);
                        PrivateKeyKeyring::import(entry.id, entry.namespace.clone(), &bytes)
                            .map(Keyring::PrivateKey)
                    }),
            };
            match restored {
                Ok(keyring) => keyrings.push(keyring),
                Err(error) => {
                    warn!(keyring = %entry.id, %error, "skipping unrestorable keyring entry");
                }
            }
        }

        {
            let mut state = self.state.lock();
            state.keyrings = keyrings;
            Self::rebuild_index(&mut state);
        }
        info!(keyrings = decoded.entries.len(), "keyrings hydrated");
        self.publish_accounts();
        Ok(())
    }

    /// Drop every keyring instance and clear the index. Secret buffers
    /// zero on drop.
    pub fn wipe(&self) {
        {
            let mut state = self.state.lock();
            state.keyrings.clear();
            state.address_index.clear();
        }
        debug!("keyrings wiped");
        self.publish_accounts();
    }

    // =========================================================================
    // KEYRING MANAGEMENT
    // =========================================================================

    /// Create an HD keyring from a validated phrase. Starts with zero
    /// derived accounts; call [`derive_next_account`](Self::derive_next_account).
    pub async fn create_hd(
        &self,
        namespace: &str,
        mnemonic: &str,
        alias: &str,
    ) -> WalletResult<Uuid> {
        self.ensure_unlocked()?;
        let id = Uuid::new_v4();
        let keyring = Keyring::Hd(HdKeyring::restore(id, namespace, mnemonic, 0)?);
        {
            let mut state = self.state.lock();
            state.keyrings.push(keyring);
            Self::rebuild_index(&mut state);
        }
        self.persist_payload().await?;
        self.metas
            .put(KeyringMeta {
                id,
                kind: KeyringKind::Hd,
                namespace: namespace.to_string(),
                alias: alias.to_string(),
                created_at: self.time.now(),
                backed_up: false,
            })
            .await?;
        info!(keyring = %id, "hd keyring created");
        Ok(id)
    }

    /// Import a raw private key as a single-account keyring.
    pub async fn import_private_key(
        &self,
        namespace: &str,
        key_bytes: &[u8],
        alias: &str,
    ) -> WalletResult<AccountRecord> {
        self.ensure_unlocked()?;
        let id = Uuid::new_v4();
        let keyring = PrivateKeyKeyring::import(id, namespace, key_bytes)?;
        let keyring = Keyring::PrivateKey(keyring);
        let address = keyring.addresses().remove(0);

        {
            let mut state = self.state.lock();
            if state.address_index.contains_key(&address) {
                return Err(duplicate(&address));
            }
            state.keyrings.push(keyring);
            Self::rebuild_index(&mut state);
        }
        self.persist_payload().await?;
        self.metas
            .put(KeyringMeta {
                id,
                kind: KeyringKind::PrivateKey,
                namespace: namespace.to_string(),
                alias: alias.to_string(),
                created_at: self.time.now(),
                backed_up: true,
            })
            .await?;
        let record = self.account_record(namespace, &address, id, None);
        self.accounts.put(record.clone()).await?;
        self.publish_accounts();
        info!(keyring = %id, "private key imported");
        Ok(record)
    }

    /// Derive the next sequential account of an HD keyring.
    pub async fn derive_next_account(&self, keyring_id: Uuid) -> WalletResult<AccountRecord> {
        self.ensure_unlocked()?;
        let (namespace, address, index) = {
            let mut state = self.state.lock();
            let position = state
                .keyrings
                .iter()
                .position(|k| k.id() == keyring_id)
                .ok_or_else(|| keyring_not_found(keyring_id))?;

            let next_address = match &state.keyrings[position] {
                Keyring::Hd(hd) => hd.preview_next()?,
                Keyring::PrivateKey(_) => {
                    return Err(WalletError::new(
                        ErrorReason::NotCompatible,
                        "private-key keyrings cannot derive accounts",
                    ))
                }
            };
            if state.address_index.contains_key(&next_address) {
                return Err(duplicate(&next_address));
            }

            let namespace = state.keyrings[position].namespace().to_string();
            let (index, address) = match &mut state.keyrings[position] {
                Keyring::Hd(hd) => hd.derive_next()?,
                Keyring::PrivateKey(_) => unreachable!("checked above"),
            };
            Self::rebuild_index(&mut state);
            (namespace, address, index)
        };

        self.persist_payload().await?;
        let record = self.account_record(&namespace, &address, keyring_id, Some(index));
        self.accounts.put(record.clone()).await?;
        self.publish_accounts();
        debug!(keyring = %keyring_id, index, "account derived");
        Ok(record)
    }

    /// Delete an account. For a private-key keyring this deletes the
    /// keyring; HD accounts are only removed with their whole keyring.
    pub async fn delete_account(&self, address_input: &str) -> WalletResult<()> {
        self.ensure_unlocked()?;
        let canonical = self.canonicalize(address_input)?;
        let (_, keyring_id) = self.lookup(&canonical)?;

        let kind = {
            let state = self.state.lock();
            state
                .keyrings
                .iter()
                .find(|k| k.id() == keyring_id)
                .map(Keyring::kind)
                .ok_or_else(|| keyring_not_found(keyring_id))?
        };
        match kind {
            KeyringKind::PrivateKey => self.delete_keyring(keyring_id).await,
            KeyringKind::Hd => Err(WalletError::new(
                ErrorReason::InvalidRequest,
                "hd accounts are removed by deleting the keyring",
            )),
        }
    }

    /// Delete a keyring and every account it owns.
    pub async fn delete_keyring(&self, keyring_id: Uuid) -> WalletResult<()> {
        self.ensure_unlocked()?;
        {
            let mut state = self.state.lock();
            let before = state.keyrings.len();
            state.keyrings.retain(|k| k.id() != keyring_id);
            if state.keyrings.len() == before {
                return Err(keyring_not_found(keyring_id));
            }
            Self::rebuild_index(&mut state);
        }
        self.persist_payload().await?;
        self.metas.delete(keyring_id).await?;
        let removed = self.accounts.delete_by_keyring(keyring_id).await?;
        self.publish_accounts();
        info!(keyring = %keyring_id, removed, "keyring deleted");
        Ok(())
    }

    // =========================================================================
    // SIGNING
    // =========================================================================

    /// `personal_sign`: EIP-191 envelope, 65-byte `r||s||v` hex result.
    pub fn sign_message(&self, address_input: &str, message: &[u8]) -> WalletResult<String> {
        let digest = personal_message_digest(message);
        let signature = self.sign_digest(address_input, &digest)?;
        Ok(format!("0x{}", hex::encode(signature.to_rsv_bytes())))
    }

    /// `eth_signTypedData_v4`: EIP-712 digest, 65-byte `r||s||v` hex.
    pub fn sign_typed_data(&self, address_input: &str, data: &TypedData) -> WalletResult<String> {
        let digest = typed_data_digest(data)?;
        let signature = self.sign_digest(address_input, &digest)?;
        Ok(format!("0x{}", hex::encode(signature.to_rsv_bytes())))
    }

    /// Sign a raw 32-byte digest. The transaction assembler drives this
    /// with the transaction sighash.
    pub fn sign_digest(
        &self,
        address_input: &str,
        digest: &[u8; 32],
    ) -> WalletResult<RecoverableSignature> {
        self.ensure_unlocked()?;
        let canonical = self.canonicalize(address_input)?;
        let (_, keyring_id) = self.lookup(&canonical)?;
        let state = self.state.lock();
        let keyring = state
            .keyrings
            .iter()
            .find(|k| k.id() == keyring_id)
            .ok_or_else(|| keyring_not_found(keyring_id))?;
        keyring.sign_prehash(&canonical, digest)
    }

    // =========================================================================
    // EXPORT (password-guarded)
    // =========================================================================

    /// Reveal an HD keyring's mnemonic after re-verifying the password.
    pub async fn export_mnemonic(
        &self,
        keyring_id: Uuid,
        password: &str,
    ) -> WalletResult<Zeroizing<String>> {
        self.ensure_unlocked()?;
        if !self.vault.verify_password(password).await? {
            return Err(WalletError::invalid_password());
        }
        let state = self.state.lock();
        let keyring = state
            .keyrings
            .iter()
            .find(|k| k.id() == keyring_id)
            .ok_or_else(|| keyring_not_found(keyring_id))?;
        match keyring {
            Keyring::Hd(hd) => Ok(Zeroizing::new(hd.mnemonic().to_string())),
            Keyring::PrivateKey(_) => Err(WalletError::new(
                ErrorReason::SecretUnavailable,
                "private-key keyrings have no mnemonic",
            )),
        }
    }

    /// Reveal one account's private key after re-verifying the password.
    pub async fn export_private_key(
        &self,
        address_input: &str,
        password: &str,
    ) -> WalletResult<Zeroizing<String>> {
        self.ensure_unlocked()?;
        if !self.vault.verify_password(password).await? {
            return Err(WalletError::invalid_password());
        }
        let canonical = self.canonicalize(address_input)?;
        let (_, keyring_id) = self.lookup(&canonical)?;
        let state = self.state.lock();
        let keyring = state
            .keyrings
            .iter()
            .find(|k| k.id() == keyring_id)
            .ok_or_else(|| keyring_not_found(keyring_id))?;
        keyring.export_private_key(&canonical)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether the active keyrings own `canonical_address` in `namespace`.
    #[must_use]
    pub fn owns(&self, namespace: &str, canonical_address: &str) -> bool {
        self.state
            .lock()
            .address_index
            .get(canonical_address)
            .is_some_and(|(ns, _)| ns == namespace)
    }

    /// All in-memory canonical addresses, in keyring order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        let state = self.state.lock();
        state.keyrings.iter().flat_map(Keyring::addresses).collect()
    }

    /// Persisted account records.
    pub async fn list_accounts(&self) -> WalletResult<Vec<AccountRecord>> {
        self.accounts.get_all().await
    }

    /// Persisted keyring metadata (survives lock).
    pub async fn list_metas(&self) -> WalletResult<Vec<KeyringMeta>> {
        self.metas.get_all().await
    }

    /// Record that the user confirmed backing up a keyring's mnemonic.
    pub async fn mark_backed_up(&self, keyring_id: Uuid) -> WalletResult<()> {
        let mut meta = self
            .metas
            .get(keyring_id)
            .await?
            .ok_or_else(|| keyring_not_found(keyring_id))?;
        meta.backed_up = true;
        self.metas.put(meta).await
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn ensure_unlocked(&self) -> WalletResult<()> {
        if self.vault.is_unlocked() {
            Ok(())
        } else {
            Err(WalletError::locked())
        }
    }

    fn canonicalize(&self, address_input: &str) -> WalletResult<String> {
        canonicalize_eth_address(address_input).map_err(|e| {
            WalletError::new(
                ErrorReason::InvalidAddress,
                format!("invalid address {address_input:?}: {e}"),
            )
        })
    }

    fn lookup(&self, canonical: &str) -> WalletResult<(String, Uuid)> {
        self.state
            .lock()
            .address_index
            .get(canonical)
            .cloned()
            .ok_or_else(|| {
                WalletError::new(
                    ErrorReason::AccountNotFound,
                    format!("no keyring owns {canonical}"),
                )
            })
    }

    fn rebuild_index(state: &mut State) {
        state.address_index.clear();
        for keyring in &state.keyrings {
            for address in keyring.addresses() {
                state
                    .address_index
                    .insert(address, (keyring.namespace().to_string(), keyring.id()));
            }
        }
    }

    fn account_record(
        &self,
        namespace: &str,
        address: &str,
        keyring_id: Uuid,
        derivation_index: Option<u32>,
    ) -> AccountRecord {
        AccountRecord {
            account_id: AccountId::new(default_chain(namespace), address),
            address: address.to_string(),
            namespace: namespace.to_string(),
            keyring_id,
            derivation_index,
            created_at: self.time.now(),
        }
    }

    async fn persist_payload(&self) -> WalletResult<()> {
        let encoded = {
            let state = self.state.lock();
            let entries = state.keyrings.iter().map(Keyring::payload_entry).collect();
            payload::encode(&KeyringPayload {
                version: payload::PAYLOAD_VERSION,
                entries,
            })?
        };
        self.vault.encrypt(&encoded).await
    }

    fn publish_accounts(&self) {
        let addresses = self.addresses();
        self.messenger.publish(&ACCOUNTS_CHANGED, addresses);
    }
}

/// The record-keying chain for a namespace's accounts. Accounts are
/// namespace-wide; the eip155 family keys its records under mainnet.
fn default_chain(_namespace: &str) -> ChainRef {
    ChainRef::eip155(1)
}

fn duplicate(address: &str) -> WalletError {
    WalletError::new(
        ErrorReason::DuplicateAccount,
        format!("account {address} already exists"),
    )
}

fn keyring_not_found(id: Uuid) -> WalletError {
    WalletError::new(ErrorReason::AccountNotFound, format!("no keyring {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SystemTimeSource;
    use wd_02_storage::{InMemoryAccountsStore, InMemoryKeyringMetaStore, InMemoryVaultMetaStore};
    use wd_03_vault::{VaultConfig, VaultService};

    const DEV_MNEMONIC: &str =
        "test test test test test test test test test test test junk";
    const FIRST: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const SECOND: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

    async fn service() -> (Arc<VaultService>, Arc<KeyringService>) {
        let messenger = Messenger::new();
        let vault = Arc::new(VaultService::new(
            Arc::new(InMemoryVaultMetaStore::new()),
            messenger.clone(),
            Arc::new(SystemTimeSource),
            VaultConfig {
                pbkdf2_iterations: 1_000,
            },
        ));
        let keyring = KeyringService::new(
            Arc::clone(&vault),
            Arc::new(InMemoryAccountsStore::new()),
            Arc::new(InMemoryKeyringMetaStore::new()),
            messenger,
            Arc::new(SystemTimeSource),
        );
        keyring.start();
        vault.init("hunter2").await.unwrap();
        vault.unlock("hunter2").await.unwrap();
        (vault, keyring)
    }

    #[tokio::test]
    async fn test_derivation_is_deterministic() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();

        let first = keyring.derive_next_account(id).await.unwrap();
        let second = keyring.derive_next_account(id).await.unwrap();
        assert_eq!(first.address, FIRST);
        assert_eq!(second.address, SECOND);
        assert_eq!(first.derivation_index, Some(0));
        assert_eq!(second.derivation_index, Some(1));
    }

    #[tokio::test]
    async fn test_hydrate_after_relock_restores_accounts() {
        let (vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        vault.lock(wd_03_vault::LockReason::User);
        assert!(keyring.addresses().is_empty());

        vault.unlock("hunter2").await.unwrap();
        assert_eq!(keyring.addresses(), vec![FIRST.to_string(), SECOND.to_string()]);
        assert!(keyring.owns("eip155", FIRST));
    }

    #[tokio::test]
    async fn test_operations_require_unlock() {
        let (vault, keyring) = service().await;
        vault.lock(wd_03_vault::LockReason::User);
        let err = keyring
            .create_hd("eip155", DEV_MNEMONIC, "primary")
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::VaultLocked);
    }

    #[tokio::test]
    async fn test_import_private_key_and_duplicate_rejection() {
        let (_vault, keyring) = service().await;
        let key =
            hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
                .unwrap();
        let record = keyring
            .import_private_key("eip155", &key, "imported")
            .await
            .unwrap();
        assert_eq!(record.address, FIRST);

        let err = keyring
            .import_private_key("eip155", &key, "again")
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::DuplicateAccount);
    }

    #[tokio::test]
    async fn test_duplicate_between_hd_and_import() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        let key =
            hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
                .unwrap();
        let err = keyring
            .import_private_key("eip155", &key, "dup")
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::DuplicateAccount);
    }

    #[tokio::test]
    async fn test_delete_private_key_account_removes_keyring() {
        let (_vault, keyring) = service().await;
        let key =
            hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
                .unwrap();
        keyring.import_private_key("eip155", &key, "imported").await.unwrap();

        keyring.delete_account(FIRST).await.unwrap();
        assert!(keyring.addresses().is_empty());
        assert!(keyring.list_accounts().await.unwrap().is_empty());
        assert!(keyring.list_metas().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_hd_account_directly_is_rejected() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        let err = keyring.delete_account(FIRST).await.unwrap_err();
        assert_eq!(err.reason, ErrorReason::InvalidRequest);

        keyring.delete_keyring(id).await.unwrap();
        assert!(keyring.addresses().is_empty());
    }

    #[tokio::test]
    async fn test_sign_message_recovers_to_signer() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        let signature = keyring.sign_message(FIRST, b"hello warden").unwrap();
        assert_eq!(signature.len(), 2 + 65 * 2);

        let digest = personal_message_digest(b"hello warden");
        let raw = hex::decode(&signature[2..]).unwrap();
        let recovered = shared_crypto::recover_address(
            &digest,
            &RecoverableSignature {
                r: raw[..32].try_into().unwrap(),
                s: raw[32..64].try_into().unwrap(),
                v: raw[64] - 27,
            },
        )
        .unwrap();
        assert_eq!(format!("0x{}", hex::encode(recovered)), FIRST);
    }

    #[tokio::test]
    async fn test_exports_reverify_password() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        let err = keyring.export_mnemonic(id, "wrong").await.unwrap_err();
        assert_eq!(err.reason, ErrorReason::InvalidPassword);

        let mnemonic = keyring.export_mnemonic(id, "hunter2").await.unwrap();
        assert_eq!(&*mnemonic, DEV_MNEMONIC);

        let key = keyring.export_private_key(FIRST, "hunter2").await.unwrap();
        assert_eq!(
            &*key,
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        );
    }

    #[tokio::test]
    async fn test_garbage_payload_hydrates_empty() {
        let (vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(id).await.unwrap();

        // Something overwrote the vault payload with junk bytes.
        vault.encrypt(b"{definitely not a payload").await.unwrap();
        vault.lock(wd_03_vault::LockReason::User);
        vault.unlock("hunter2").await.unwrap();

        // Hydration treats it as empty instead of failing the unlock.
        assert!(vault.is_unlocked());
        assert!(keyring.addresses().is_empty());
    }

    #[tokio::test]
    async fn test_mark_backed_up() {
        let (_vault, keyring) = service().await;
        let id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        assert!(!keyring.list_metas().await.unwrap()[0].backed_up);
        keyring.mark_backed_up(id).await.unwrap();
        assert!(keyring.list_metas().await.unwrap()[0].backed_up);
    }
}
