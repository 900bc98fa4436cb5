//! The relay node: construction and run loop.
//!
//! [`RelayNode`] owns the process-wide mutable state (the directory pair, the
//! handshake table, the pending-query table) and the services operating on
//! it. Construction builds shared handles first and injects them into each
//! service; the gossip service reaches the dialer through a channel rather
//! than a back-pointer, which keeps the construction graph acyclic.

use crate::config::RelayConfig;
use crate::directory::Directories;
use crate::error::RelayError;
use crate::gossip::{DialRequest, GossipService};
use crate::handshake::HandshakeEngine;
use crate::locator::Locator;
use crate::router::DataRouter;
use crate::session::{Session, SessionId};
use crate::transport;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock};
use wisp_crypto::{Identity, PublicKey};

/// One relay node.
pub struct RelayNode {
    identity: Arc<Identity>,
    config: RelayConfig,
    pub(crate) directories: Arc<RwLock<Directories>>,
    pub(crate) handshake: HandshakeEngine,
    pub(crate) router: DataRouter,
    pub(crate) locator: Arc<Locator>,
    pub(crate) gossip: GossipService,
    dial_tx: mpsc::UnboundedSender<DialRequest>,
    dial_rx: Mutex<Option<mpsc::UnboundedReceiver<DialRequest>>>,
    public_url: Arc<OnceLock<String>>,
    next_session: AtomicU64,
}

impl RelayNode {
    /// Build a node with a fresh identity. The keypair lives for the process
    /// only; nothing is persisted.
    pub fn new(config: RelayConfig) -> Arc<Self> {
        Self::with_identity(Arc::new(Identity::generate()), config)
    }

    /// Build a node around an existing identity.
    pub fn with_identity(identity: Arc<Identity>, config: RelayConfig) -> Arc<Self> {
        let own_key = *identity.public_key();
        let directories = Arc::new(RwLock::new(Directories::new()));
        let locator = Locator::new(own_key, directories.clone(), config.query_timeout);
        let (dial_tx, dial_rx) = mpsc::unbounded_channel();

        let public_url = Arc::new(OnceLock::new());
        if let Some(url) = &config.public_url {
            let _ = public_url.set(url.clone());
        }

        let gossip = GossipService::new(
            directories.clone(),
            locator.clone(),
            dial_tx.clone(),
            own_key,
            public_url.clone(),
            config.dial_delay,
        );
        let handshake = HandshakeEngine::new(identity.clone());
        let router = DataRouter::new(directories.clone(), locator.clone());

        Arc::new(Self {
            identity,
            config,
            directories,
            handshake,
            router,
            locator,
            gossip,
            dial_tx,
            dial_rx: Mutex::new(Some(dial_rx)),
            public_url,
            next_session: AtomicU64::new(0),
        })
    }

    /// This node's public key.
    pub fn public_key(&self) -> &PublicKey {
        self.identity.public_key()
    }

    /// The URL this node advertises, once the listener is bound.
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.get().map(String::as_str)
    }

    /// The node's configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Shared directory handle, exposed for inspection and tests.
    pub fn directories(&self) -> &Arc<RwLock<Directories>> {
        &self.directories
    }

    /// Number of pending federated lookups.
    pub fn pending_queries(&self) -> usize {
        self.locator.pending_count()
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        self.next_session.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Bind the listener and spawn the accept and dial loops.
    ///
    /// Returns the bound address (relevant when the configured port is 0).
    /// Seeds from the configuration are dialed immediately.
    ///
    /// # Errors
    ///
    /// [`RelayError::Bind`] when the listener cannot be bound; this is the
    /// node's only fatal error.
    pub async fn start(self: Arc<Self>) -> Result<SocketAddr, RelayError> {
        let requested = SocketAddr::new(self.config.host, self.config.port);
        let listener = TcpListener::bind(requested)
            .await
            .map_err(|source| RelayError::Bind {
                addr: requested.to_string(),
                source,
            })?;
        let local = listener.local_addr().map_err(|source| RelayError::Bind {
            addr: requested.to_string(),
            source,
        })?;

        // a configured public URL wins; otherwise derive from the bound port
        let _ = self
            .public_url
            .set(format!("ws://127.0.0.1:{}", local.port()));

        tracing::info!(
            address = %local,
            key = %hex::encode(&self.public_key()[..8]),
            url = self.public_url().unwrap_or("?"),
            "relay listening"
        );

        if let Some(mut dial_rx) = self.dial_rx.lock().await.take() {
            let node = Arc::clone(&self);
            tokio::spawn(async move {
                while let Some(request) = dial_rx.recv().await {
                    let node = Arc::clone(&node);
                    tokio::spawn(async move {
                        if !request.delay.is_zero() {
                            tokio::time::sleep(request.delay).await;
                        }
                        transport::dial(node, request.url).await;
                    });
                }
            });
        }

        for seed in &self.config.seeds {
            let _ = self.dial_tx.send(DialRequest {
                url: seed.clone(),
                delay: Duration::ZERO,
            });
        }

        let node = Arc::clone(&self);
        tokio::spawn(async move {
            transport::serve(node, listener).await;
        });

        Ok(local)
    }

    /// Bind and serve until the process is terminated.
    ///
    /// # Errors
    ///
    /// Propagates [`RelayNode::start`] failures.
    pub async fn run(self: Arc<Self>) -> Result<(), RelayError> {
        Arc::clone(&self).start().await?;
        std::future::pending::<()>().await;
        Ok(())
    }

    /// Tear down everything a departed session owned: its handshake state
    /// and whichever directory record references it. Pending queries are
    /// untouched; they live on their own deadlines.
    pub(crate) async fn handle_close(&self, session: &Arc<Session>) {
        self.handshake.forget(session.id());
        session.mark_closed();

        let mut dirs = self.directories.write().await;
        if let Some(key) = dirs.clients_mut().remove_by_session(session.id()) {
            tracing::info!(
                session = session.id(),
                client = %hex::encode(&key[..8]),
                "client disconnected"
            );
        }
        if let Some(key) = dirs.peers_mut().detach_session(session.id()) {
            tracing::info!(
                session = session.id(),
                peer = %hex::encode(&key[..8]),
                "peer session detached"
            );
        }
    }
}

impl std::fmt::Debug for RelayNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayNode")
            .field("key", &hex::encode(&self.public_key()[..8]))
            .field("public_url", &self.public_url())
            .finish_non_exhaustive()
    }
}
