//! Shared harness for the integration flows.

use parking_lot::Mutex;
use shared_types::SystemTimeSource;
use std::sync::Arc;
use wd_06_network::test_support::{MockClientFactory, MockEip155Client};
use wd_08_transactions::TrackerConfig;
use wd_10_bridge::{Envelope, ProviderSink};
use wallet_runtime::{Runtime, RuntimeConfig, StorageAdapters};

/// The dev-chain mnemonic used by the derivation scenarios.
pub const DEV_MNEMONIC: &str =
    "test test test test test test test test test test test junk";

/// Canonical form of the first derived dev account.
pub const FIRST: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// EIP-55 form of the first derived dev account.
pub const FIRST_CHECKSUMMED: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Canonical form of the second derived dev account.
pub const SECOND: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

/// A fully-wired runtime plus the scripted client behind it.
pub struct Harness {
    pub runtime: Runtime,
    pub client: Arc<MockEip155Client>,
}

/// Build a runtime over in-memory adapters, fast PBKDF2, and a fast
/// receipt tracker.
pub async fn harness() -> Harness {
    let client = MockEip155Client::new();
    let factory = Arc::new(MockClientFactory::new(Arc::clone(&client)));

    let mut config = RuntimeConfig::default();
    config.vault.pbkdf2_iterations = 1_000;
    config.transactions.tracker = TrackerConfig {
        initial_delay_ms: 10,
        max_delay_ms: 40,
        max_attempts: 10,
    };

    let runtime = Runtime::initialize(
        StorageAdapters::in_memory(),
        factory,
        Arc::new(SystemTimeSource),
        config,
    )
    .await
    .expect("runtime initializes");
    runtime.start().await.expect("runtime starts");

    Harness { runtime, client }
}

/// Drive onboarding: init, unlock, import the dev mnemonic (deriving
/// the first account).
pub async fn onboard(harness: &Harness) {
    harness
        .runtime
        .ui()
        .handle("ui.vault.init", serde_json::json!({ "password": "hunter2" }))
        .await
        .unwrap();
    harness
        .runtime
        .ui()
        .handle("ui.vault.unlock", serde_json::json!({ "password": "hunter2" }))
        .await
        .unwrap();
    harness
        .runtime
        .ui()
        .handle(
            "ui.keyring.importMnemonic",
            serde_json::json!({ "mnemonic": DEV_MNEMONIC, "alias": "Primary" }),
        )
        .await
        .unwrap();
}

/// Sink that records everything delivered to a session.
#[derive(Default)]
pub struct CapturingSink {
    pub envelopes: Mutex<Vec<Envelope>>,
}

impl CapturingSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ProviderSink for CapturingSink {
    fn deliver(&self, envelope: &Envelope) {
        self.envelopes.lock().push(envelope.clone());
    }
}

/// Spawn a UI task that approves the next pending approval with an
/// empty decision.
pub fn approve_next(harness: &Harness) -> tokio::task::JoinHandle<()> {
    let ui = Arc::clone(harness.runtime.ui());
    let approvals = Arc::clone(&harness.runtime.controllers().approvals);
    tokio::spawn(async move {
        for _ in 0..500 {
            tokio::task::yield_now().await;
            if let Some(task) = approvals.pending().first().cloned() {
                ui.handle(
                    "ui.approvals.resolve",
                    serde_json::json!({ "id": task.id }),
                )
                .await
                .unwrap();
                return;
            }
        }
        panic!("no approval appeared");
    })
}
