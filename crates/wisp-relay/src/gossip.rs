//! The node-info subprotocol: peer discovery and addressee location.
//!
//! Gossip never dials directly. Discovered addresses are turned into
//! [`DialRequest`]s on a channel the node's dial loop consumes, which keeps
//! this service free of a transport back-pointer.

use crate::directory::Directories;
use crate::error::RelayError;
use crate::locator::Locator;
use crate::session::{Session, SessionRole};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use wisp_crypto::PublicKey;
use wisp_proto::{Frame, FrameType, NodeInfo};

/// An outbound dial the gossip service wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    /// URL to dial.
    pub url: String,
    /// How long to wait before dialing.
    pub delay: Duration,
}

/// Build a NODE_INFO frame carrying `info`, sent as `sender`.
pub(crate) fn node_info_frame(sender: PublicKey, info: &NodeInfo) -> Option<Frame> {
    match info.encode() {
        Ok(payload) => Some(Frame::new(FrameType::NodeInfo, payload).with_sender(sender)),
        Err(err) => {
            tracing::warn!("unencodable node-info payload: {err}");
            None
        }
    }
}

/// Handles inbound NODE_INFO frames from authenticated sessions.
pub struct GossipService {
    directories: Arc<RwLock<Directories>>,
    locator: Arc<Locator>,
    dial_tx: mpsc::UnboundedSender<DialRequest>,
    own_key: PublicKey,
    public_url: Arc<OnceLock<String>>,
    dial_delay: Duration,
}

impl GossipService {
    /// Create the service. `public_url` is filled in once the listener is
    /// bound; until then self-address suppression matches nothing.
    pub fn new(
        directories: Arc<RwLock<Directories>>,
        locator: Arc<Locator>,
        dial_tx: mpsc::UnboundedSender<DialRequest>,
        own_key: PublicKey,
        public_url: Arc<OnceLock<String>>,
        dial_delay: Duration,
    ) -> Self {
        Self {
            directories,
            locator,
            dial_tx,
            own_key,
            public_url,
            dial_delay,
        }
    }

    fn is_self_address(&self, address: &str) -> bool {
        self.public_url.get().is_some_and(|url| url == address)
    }

    /// Process one NODE_INFO frame. Malformed bodies are dropped with a
    /// warning; the session stays open.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature leaves room for handler faults the
    /// dispatcher turns into session closes.
    pub async fn handle(&self, session: &Arc<Session>, frame: &Frame) -> Result<(), RelayError> {
        let info = match NodeInfo::decode(&frame.payload) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(session = session.id(), "malformed node-info, dropping: {err}");
                return Ok(());
            }
        };

        match info {
            NodeInfo::RequestServers => {
                let adverts = self.directories.read().await.peers().adverts();
                if let Some(response) =
                    node_info_frame(self.own_key, &NodeInfo::ResponseServers(adverts))
                {
                    session.send(&response);
                }
            }

            NodeInfo::ResponseServers(adverts) => {
                // only peers are trusted to seed our federation view
                if session.role() != SessionRole::Peer {
                    tracing::warn!(
                        session = session.id(),
                        "server list from non-peer session, ignoring"
                    );
                    return Ok(());
                }
                let mut dirs = self.directories.write().await;
                for advert in adverts {
                    if advert.key == self.own_key || self.is_self_address(&advert.address) {
                        continue;
                    }
                    if !dirs.peers_mut().insert_known(advert.key, advert.address.clone()) {
                        continue;
                    }
                    tracing::info!(
                        peer = %hex::encode(&advert.key[..8]),
                        address = %advert.address,
                        "discovered peer"
                    );
                    let _ = self.dial_tx.send(DialRequest {
                        url: advert.address,
                        delay: self.dial_delay,
                    });
                }
            }

            NodeInfo::AddServer(address) => {
                if self.is_self_address(&address) {
                    tracing::debug!("add-server names our own address, ignoring");
                    return Ok(());
                }
                if self.directories.read().await.peers().has_address(&address) {
                    tracing::debug!(%address, "add-server for known peer, ignoring");
                    return Ok(());
                }
                tracing::info!(%address, session = session.id(), "add-server, dialing");
                let _ = self.dial_tx.send(DialRequest {
                    url: address,
                    delay: Duration::ZERO,
                });
            }

            NodeInfo::QueryClient(target) => {
                let hosted = self.directories.read().await.clients().contains(&target);
                let response = NodeInfo::QueryResponse {
                    target,
                    owner: hosted.then_some(self.own_key),
                };
                // answered on the session the query arrived on; never forwarded
                if let Some(frame) = node_info_frame(self.own_key, &response) {
                    session.send(&frame);
                }
                tracing::debug!(
                    target = %hex::encode(&target[..8]),
                    hosted,
                    "answered location query"
                );
            }

            NodeInfo::QueryResponse { target, owner } => {
                self.locator.handle_response(target, owner).await;
            }

            NodeInfo::RequestClients | NodeInfo::ResponseClients => {
                tracing::warn!(
                    session = session.id(),
                    subtype = info.subtype(),
                    "reserved node-info subtype, dropping"
                );
            }
        }
        Ok(())
    }
}
