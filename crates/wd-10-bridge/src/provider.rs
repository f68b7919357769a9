//! Provider bridge: per-origin sessions over an abstract sink.

use crate::wire::{
    ConnectInfo, Envelope, EnvelopeBody, HandshakeAck, HandshakeMeta, JsonRpcRequest,
    JsonRpcResponse, ProviderEvent, PROVIDER_PROTOCOL_VERSION,
};
use parking_lot::Mutex;
use shared_bus::{Messenger, SubscriptionHandle};
use shared_types::{ChainRef, ErrorReason, Origin, RequestContext, WalletError, WalletResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wd_01_chain_registry::format_address;
use wd_03_vault::topics::{VAULT_LOCKED, VAULT_UNLOCKED};
use wd_05_permissions::topics::PERMISSIONS_CHANGED;
use wd_06_network::topics::CHAIN_CHANGED;
use wd_09_rpc_engine::{Controllers, RpcEngine};

/// Transport half of a session: delivers envelopes to the page.
pub trait ProviderSink: Send + Sync {
    fn deliver(&self, envelope: &Envelope);
}

struct Session {
    origin: String,
    port_id: String,
    sink: Arc<dyn ProviderSink>,
}

/// Session registry plus event fan-out.
pub struct ProviderBridge {
    engine: Arc<RpcEngine>,
    controllers: Arc<Controllers>,
    messenger: Messenger,
    sessions: Mutex<HashMap<String, Session>>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl ProviderBridge {
    pub fn new(
        engine: Arc<RpcEngine>,
        controllers: Arc<Controllers>,
        messenger: Messenger,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            controllers,
            messenger,
            sessions: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Wire bus subscriptions: forward chain switches, permission
    /// changes, and session-lock transitions to every connected page.
    pub fn start(self: &Arc<Self>) {
        let mut subscriptions = self.subscriptions.lock();

        subscriptions.push({
            let bridge = Arc::clone(self);
            self.messenger.subscribe(&CHAIN_CHANGED, move |chain: &ChainRef| {
                if let Some(hex) = chain.eip155_hex_chain_id() {
                    bridge.broadcast(ProviderEvent::ChainChanged(hex));
                }
                Ok(())
            })
        });

        subscriptions.push({
            let bridge = Arc::clone(self);
            self.messenger.subscribe(&PERMISSIONS_CHANGED, move |_records| {
                bridge.spawn_accounts_changed();
                Ok(())
            })
        });

        subscriptions.push({
            let bridge = Arc::clone(self);
            self.messenger.subscribe(&VAULT_UNLOCKED, move |_| {
                bridge.spawn_connect();
                Ok(())
            })
        });

        subscriptions.push({
            let bridge = Arc::clone(self);
            self.messenger.subscribe(&VAULT_LOCKED, move |_reason| {
                bridge.broadcast(ProviderEvent::AccountsChanged(Vec::new()));
                Ok(())
            })
        });
    }

    /// Unsubscribe and drop every session. Part of runtime teardown.
    pub fn destroy(&self) {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
        self.broadcast(ProviderEvent::Disconnect(None));
        self.sessions.lock().clear();
    }

    /// Dispatch one inbound envelope from the transport: `handshake`
    /// registers the session and answers; `request` routes through the
    /// engine. Any response envelope is returned for the transport to
    /// send.
    pub async fn handle_envelope(
        &self,
        envelope: Envelope,
        origin: &str,
        port_id: &str,
        sink: Arc<dyn ProviderSink>,
    ) -> WalletResult<Option<Envelope>> {
        if envelope.channel != crate::wire::PROVIDER_CHANNEL {
            return Err(WalletError::new(
                ErrorReason::InvalidRequest,
                format!("unexpected channel {:?}", envelope.channel),
            ));
        }
        match envelope.body {
            // The transport-attested origin is authoritative; the
            // page-claimed one inside the envelope is ignored.
            EnvelopeBody::Handshake { handshake_id, .. } => {
                self.connect_session(&envelope.session_id, port_id, origin, &handshake_id, sink)
                    .await?;
                Ok(None)
            }
            EnvelopeBody::Request { request } => {
                Ok(Some(self.handle_request(&envelope.session_id, request).await?))
            }
            other => Err(WalletError::new(
                ErrorReason::InvalidRequest,
                format!("unexpected inbound envelope: {other:?}"),
            )),
        }
    }

    /// Register a session and answer its handshake.
    pub async fn connect_session(
        &self,
        session_id: &str,
        port_id: &str,
        origin: &str,
        handshake_id: &str,
        sink: Arc<dyn ProviderSink>,
    ) -> WalletResult<()> {
        let ack = self.handshake_ack(origin, handshake_id).await?;
        self.sessions.lock().insert(
            session_id.to_string(),
            Session {
                origin: origin.to_string(),
                port_id: port_id.to_string(),
                sink: Arc::clone(&sink),
            },
        );
        info!(session_id, origin, "provider session connected");
        sink.deliver(&Envelope::new(
            session_id,
            EnvelopeBody::HandshakeAck { payload: ack },
        ));
        Ok(())
    }

    /// Route one JSON-RPC request through the engine and wrap the
    /// response envelope.
    pub async fn handle_request(
        &self,
        session_id: &str,
        request: JsonRpcRequest,
    ) -> WalletResult<Envelope> {
        let (origin, port_id) = {
            let sessions = self.sessions.lock();
            let session = sessions.get(session_id).ok_or_else(|| {
                WalletError::new(
                    ErrorReason::InvalidRequest,
                    format!("unknown session {session_id}"),
                )
            })?;
            (session.origin.clone(), session.port_id.clone())
        };

        let context = RequestContext::new(port_id, session_id);
        let result = self
            .engine
            .handle(
                Origin::Web(origin),
                context,
                &request.method,
                request.params,
            )
            .await;

        let response = match result {
            Ok(value) => JsonRpcResponse::result(request.id, value),
            Err(error) => {
                debug!(method = request.method, %error, "request failed");
                JsonRpcResponse::error(request.id, &error)
            }
        };
        Ok(Envelope::new(session_id, EnvelopeBody::Response { response }))
    }

    /// A session's transport disappeared: expire its approvals and
    /// forget it.
    pub async fn session_closed(&self, session_id: &str) -> WalletResult<usize> {
        let port_id = match self.sessions.lock().remove(session_id) {
            Some(session) => session.port_id,
            None => return Ok(0),
        };
        let context = RequestContext::new(port_id, session_id);
        let expired = self
            .controllers
            .approvals
            .expire_by_request_context(&context)
            .await?;
        info!(session_id, expired, "provider session closed");
        Ok(expired)
    }

    /// Connected session count.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    async fn handshake_ack(
        &self,
        origin: &str,
        handshake_id: &str,
    ) -> WalletResult<HandshakeAck> {
        let chain = self.controllers.network.active_chain();
        let chain_id = chain.eip155_hex_chain_id().unwrap_or_default();
        let accounts = self.permitted_for(origin, &chain).await?;
        let supported = self
            .controllers
            .network
            .known_chains()
            .await?
            .into_iter()
            .map(|metadata| metadata.chain_ref.to_string())
            .collect();

        Ok(HandshakeAck {
            protocol_version: PROVIDER_PROTOCOL_VERSION,
            handshake_id: handshake_id.to_string(),
            chain_id,
            caip2: chain.to_string(),
            accounts,
            is_unlocked: self.controllers.vault.is_unlocked(),
            meta: HandshakeMeta {
                active_chain: chain.to_string(),
                active_namespace: chain.namespace().to_string(),
                supported_chains: supported,
            },
        })
    }

    async fn permitted_for(&self, origin: &str, chain: &ChainRef) -> WalletResult<Vec<String>> {
        let all = self.controllers.keyring.addresses();
        let permitted = self
            .controllers
            .permissions
            .permitted_accounts(origin, chain.namespace(), chain, &all)
            .await?;
        permitted
            .iter()
            .map(|address| format_address(chain, address))
            .collect()
    }

    /// Deliver one event to every session, regardless of origin.
    fn broadcast(&self, event: ProviderEvent) {
        let sessions = self.sessions.lock();
        for (session_id, session) in sessions.iter() {
            session.sink.deliver(&Envelope::new(
                session_id.clone(),
                EnvelopeBody::Event {
                    event: event.clone(),
                },
            ));
        }
    }

    /// Recompute each session's permitted accounts off the bus thread
    /// and deliver per-origin `accountsChanged`.
    fn spawn_accounts_changed(self: &Arc<Self>) {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            let chain = bridge.controllers.network.active_chain();
            let targets: Vec<(String, String)> = {
                let sessions = bridge.sessions.lock();
                sessions
                    .iter()
                    .map(|(id, session)| (id.clone(), session.origin.clone()))
                    .collect()
            };
            for (session_id, origin) in targets {
                match bridge.permitted_for(&origin, &chain).await {
                    Ok(accounts) => {
                        let sessions = bridge.sessions.lock();
                        if let Some(session) = sessions.get(&session_id) {
                            session.sink.deliver(&Envelope::new(
                                session_id.clone(),
                                EnvelopeBody::Event {
                                    event: ProviderEvent::AccountsChanged(accounts),
                                },
                            ));
                        }
                    }
                    Err(error) => {
                        warn!(origin, %error, "accountsChanged fan-out failed");
                    }
                }
            }
        });
    }

    fn spawn_connect(self: &Arc<Self>) {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            let chain = bridge.controllers.network.active_chain();
            let chain_id = chain.eip155_hex_chain_id().unwrap_or_default();
            let targets: Vec<(String, String)> = {
                let sessions = bridge.sessions.lock();
                sessions
                    .iter()
                    .map(|(id, session)| (id.clone(), session.origin.clone()))
                    .collect()
            };
            for (session_id, origin) in targets {
                if let Ok(accounts) = bridge.permitted_for(&origin, &chain).await {
                    let sessions = bridge.sessions.lock();
                    if let Some(session) = sessions.get(&session_id) {
                        session.sink.deliver(&Envelope::new(
                            session_id.clone(),
                            EnvelopeBody::Event {
                                event: ProviderEvent::Connect(ConnectInfo {
                                    chain_id: chain_id.clone(),
                                    accounts,
                                    is_unlocked: true,
                                }),
                            },
                        ));
                    }
                }
            }
        });
    }
}
