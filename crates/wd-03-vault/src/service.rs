//! The vault service.

use crate::ciphertext;
use crate::topics::{SESSION_CHANGED, VAULT_LOCKED, VAULT_UNLOCKED};
use crate::{clamp_auto_lock_duration, DEFAULT_AUTO_LOCK_MS};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::Messenger;
use shared_crypto::{derive_vault_key, open, random_iv, random_salt, seal, SecretKey,
    PBKDF2_ITERATIONS};
use shared_types::{
    ErrorReason, TimeSource, Timestamp, VaultCiphertext, WalletError, WalletResult,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wd_02_storage::{VaultMetaPayload, VaultMetaSnapshot, VaultMetaStore};
use zeroize::Zeroizing;

/// Why the session locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// The user asked.
    User,
    /// The auto-lock timer fired.
    Timeout,
    /// The runtime is shutting down.
    Teardown,
}

/// Denormalized session view for the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub initialized: bool,
    pub is_unlocked: bool,
    pub auto_lock_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_auto_lock_at: Option<Timestamp>,
}

/// Vault tuning.
#[derive(Debug, Clone, Copy)]
pub struct VaultConfig {
    /// PBKDF2 iteration count for new ciphertexts. Tests dial this down;
    /// production uses the compile-time constant.
    pub pbkdf2_iterations: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }
}

struct VaultState {
    ciphertext: Option<VaultCiphertext>,
    key: Option<SecretKey>,
    auto_lock_duration_ms: u64,
    initialized_at: Option<Timestamp>,
    next_auto_lock_at: Option<Timestamp>,
}

/// Password-derived encryption of the keyring payload, plus the
/// unlock/lock session.
pub struct VaultService {
    store: Arc<dyn VaultMetaStore>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    config: VaultConfig,
    state: Mutex<VaultState>,
}

impl VaultService {
    pub fn new(
        store: Arc<dyn VaultMetaStore>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
        config: VaultConfig,
    ) -> Self {
        Self {
            store,
            messenger,
            time,
            config,
            state: Mutex::new(VaultState {
                ciphertext: None,
                key: None,
                auto_lock_duration_ms: DEFAULT_AUTO_LOCK_MS,
                initialized_at: None,
                next_auto_lock_at: None,
            }),
        }
    }

    /// Load persisted vault metadata into memory. Runs once at startup.
    pub async fn initialize(&self) -> WalletResult<()> {
        if let Some(snapshot) = self.store.load().await? {
            let mut state = self.state.lock();
            state.ciphertext = snapshot.payload.ciphertext;
            state.auto_lock_duration_ms =
                clamp_auto_lock_duration(snapshot.payload.auto_lock_duration_ms);
            state.initialized_at = snapshot.payload.initialized_at;
        }
        self.publish_session();
        Ok(())
    }

    /// Create a fresh vault encrypting an empty payload. Leaves the
    /// session locked.
    ///
    /// # Errors
    ///
    /// `already-initialized` when a ciphertext exists.
    pub async fn init(&self, password: &str) -> WalletResult<()> {
        if self.state.lock().ciphertext.is_some() {
            return Err(WalletError::new(
                ErrorReason::VaultAlreadyInitialized,
                "vault is already initialized",
            ));
        }

        let salt = random_salt();
        let iterations = self.config.pbkdf2_iterations;
        let key = Self::derive_key(password.to_string(), salt.to_vec(), iterations).await?;
        let iv = random_iv();
        let cipher = seal(&key, &iv, &[])
            .map_err(|e| WalletError::internal(format!("vault init seal failed: {e}")))?;

        let now = self.time.now();
        let envelope = ciphertext::build(&salt, iterations, &iv, &cipher, now);
        {
            let mut state = self.state.lock();
            state.ciphertext = Some(envelope);
            state.initialized_at = Some(now);
        }
        self.save_snapshot().await?;
        self.publish_session();
        info!("vault initialized");
        Ok(())
    }

    /// Open the vault with a password and hold the key for the session.
    ///
    /// # Errors
    ///
    /// `not-initialized` without a ciphertext, `invalid-password` when the
    /// derived key does not open it, `corrupt-ciphertext` when the stored
    /// envelope fails validation.
    pub async fn unlock(&self, password: &str) -> WalletResult<()> {
        let envelope = self
            .state
            .lock()
            .ciphertext
            .clone()
            .ok_or_else(|| not_initialized())?;
        let decoded = ciphertext::decode(&envelope)?;

        let key =
            Self::derive_key(password.to_string(), decoded.salt.clone(), decoded.iterations)
                .await?;
        if open(&key, &decoded.iv, &decoded.cipher).is_err() {
            debug!("unlock attempt with wrong password");
            return Err(WalletError::invalid_password());
        }

        {
            let mut state = self.state.lock();
            // Replacing the key drops (and zeroes) any previous one.
            state.key = Some(key);
        }
        self.publish_session();
        self.messenger.publish(&VAULT_UNLOCKED, ());
        info!("vault unlocked");
        Ok(())
    }

    /// Wipe the session key and notify subscribers. Idempotent: locking a
    /// locked vault does nothing.
    pub fn lock(&self, reason: LockReason) {
        let was_unlocked = {
            let mut state = self.state.lock();
            state.next_auto_lock_at = None;
            state.key.take().is_some()
        };
        if !was_unlocked {
            return;
        }
        self.publish_session();
        self.messenger.publish(&VAULT_LOCKED, reason);
        info!(?reason, "vault locked");
    }

    /// Whether a ciphertext exists.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().ciphertext.is_some()
    }

    /// Whether the session key is present.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.state.lock().key.is_some()
    }

    /// Decrypt the stored payload with the session key.
    ///
    /// # Errors
    ///
    /// `locked` without a session key; `corrupt-ciphertext` when the
    /// stored envelope fails to open under the session key.
    pub fn decrypt(&self) -> WalletResult<Zeroizing<Vec<u8>>> {
        let (key, envelope) = {
            let state = self.state.lock();
            let key = state.key.clone().ok_or_else(WalletError::locked)?;
            let envelope = state.ciphertext.clone().ok_or_else(not_initialized)?;
            (key, envelope)
        };
        let decoded = ciphertext::decode(&envelope)?;
        let plaintext = open(&key, &decoded.iv, &decoded.cipher).map_err(|_| {
            warn!("stored ciphertext failed to open under the session key");
            WalletError::new(ErrorReason::CorruptCiphertext, "ciphertext failed to open")
        })?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Encrypt a new payload under the session key and persist it.
    ///
    /// A fresh IV is drawn per write; salt and iteration count are
    /// carried over so the password keeps verifying.
    ///
    /// # Errors
    ///
    /// `locked` without a session key.
    pub async fn encrypt(&self, plaintext: &[u8]) -> WalletResult<()> {
        let (key, envelope) = {
            let state = self.state.lock();
            let key = state.key.clone().ok_or_else(WalletError::locked)?;
            let envelope = state.ciphertext.clone().ok_or_else(not_initialized)?;
            (key, envelope)
        };
        let decoded = ciphertext::decode(&envelope)?;

        let iv = random_iv();
        let cipher = seal(&key, &iv, plaintext)
            .map_err(|e| WalletError::internal(format!("vault seal failed: {e}")))?;
        let next = ciphertext::build(
            &decoded.salt,
            decoded.iterations,
            &iv,
            &cipher,
            envelope.created_at,
        );

        self.state.lock().ciphertext = Some(next);
        self.save_snapshot().await
    }

    /// A clone of the session key for callers that encrypt out-of-band.
    ///
    /// # Errors
    ///
    /// `locked` without a session key.
    pub fn export_key(&self) -> WalletResult<SecretKey> {
        self.state
            .lock()
            .key
            .clone()
            .ok_or_else(WalletError::locked)
    }

    /// Check a candidate password against the stored ciphertext without
    /// touching the session.
    ///
    /// # Errors
    ///
    /// `not-initialized` without a ciphertext.
    pub async fn verify_password(&self, password: &str) -> WalletResult<bool> {
        let envelope = self
            .state
            .lock()
            .ciphertext
            .clone()
            .ok_or_else(not_initialized)?;
        let decoded = ciphertext::decode(&envelope)?;
        let key =
            Self::derive_key(password.to_string(), decoded.salt.clone(), decoded.iterations)
                .await?;
        Ok(open(&key, &decoded.iv, &decoded.cipher).is_ok())
    }

    /// Round, clamp, persist, and publish a new auto-lock duration.
    /// Returns the effective value.
    pub async fn set_auto_lock_duration(&self, ms: u64) -> WalletResult<u64> {
        let effective = clamp_auto_lock_duration(ms);
        self.state.lock().auto_lock_duration_ms = effective;
        self.save_snapshot().await?;
        self.publish_session();
        Ok(effective)
    }

    /// The effective auto-lock duration.
    #[must_use]
    pub fn auto_lock_duration_ms(&self) -> u64 {
        self.state.lock().auto_lock_duration_ms
    }

    /// Record (or clear) the next scheduled auto-lock instant.
    pub(crate) fn note_next_auto_lock(&self, at: Option<Timestamp>) {
        self.state.lock().next_auto_lock_at = at;
        self.publish_session();
    }

    /// The current session view.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        let state = self.state.lock();
        SessionState {
            initialized: state.ciphertext.is_some(),
            is_unlocked: state.key.is_some(),
            auto_lock_duration_ms: state.auto_lock_duration_ms,
            next_auto_lock_at: state.next_auto_lock_at,
        }
    }

    fn publish_session(&self) {
        let session = self.session_state();
        self.messenger.publish(&SESSION_CHANGED, session);
    }

    async fn save_snapshot(&self) -> WalletResult<()> {
        let snapshot = {
            let state = self.state.lock();
            VaultMetaSnapshot {
                version: shared_types::PROTOCOL_VERSION,
                updated_at: self.time.now(),
                payload: VaultMetaPayload {
                    ciphertext: state.ciphertext.clone(),
                    auto_lock_duration_ms: state.auto_lock_duration_ms,
                    initialized_at: state.initialized_at,
                },
            }
        };
        self.store.save(snapshot).await
    }

    /// PBKDF2 runs on the blocking pool; 600k iterations would stall the
    /// cooperative loop otherwise.
    async fn derive_key(
        password: String,
        salt: Vec<u8>,
        iterations: u32,
    ) -> WalletResult<SecretKey> {
        tokio::task::spawn_blocking(move || derive_vault_key(&password, &salt, iterations))
            .await
            .map_err(|e| WalletError::internal(format!("key derivation task failed: {e}")))
    }
}

fn not_initialized() -> WalletError {
    WalletError::new(ErrorReason::VaultNotInitialized, "vault is not initialized")
}
