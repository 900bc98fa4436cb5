//! Federated addressee location.
//!
//! When a data frame names an addressee this node does not host, the frame
//! is parked here while a one-hop QUERY_CLIENT broadcast asks every open
//! peer session who hosts it. The first QUERY_RESPONSE consumes the entry:
//! found and dial-able means the parked frame is forwarded to the owning
//! peer, anything else means it is dropped. Entries not consumed within the
//! query timeout expire silently; no negative answer propagates upstream.
//!
//! At most one lookup per addressee is outstanding. Further frames for the
//! same addressee inside the window are dropped, not queued.

use crate::directory::Directories;
use crate::gossip::node_info_frame;
use crate::session::SessionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use wisp_crypto::PublicKey;
use wisp_proto::{Frame, NodeInfo};

/// One parked frame awaiting a location answer.
struct PendingQuery {
    /// Deep copy of the original frame: its payload still carries the
    /// 32-byte addressee prefix so the owning relay can deliver it.
    frame: Frame,
    /// When this entry expires.
    deadline: Instant,
    /// Distinguishes this entry from successors under the same addressee,
    /// so a late expiry timer never removes a fresh lookup.
    entry_id: u64,
    /// Session the frame arrived on, for diagnostics.
    sender: SessionId,
}

/// The pending-query table and lookup driver.
pub struct Locator {
    pending: Arc<DashMap<PublicKey, PendingQuery>>,
    next_entry: AtomicU64,
    directories: Arc<RwLock<Directories>>,
    own_key: PublicKey,
    query_timeout: Duration,
}

impl Locator {
    /// Create a locator broadcasting queries as `own_key`.
    pub fn new(
        own_key: PublicKey,
        directories: Arc<RwLock<Directories>>,
        query_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            pending: Arc::new(DashMap::new()),
            next_entry: AtomicU64::new(0),
            directories,
            own_key,
            query_timeout,
        })
    }

    /// Park `frame` for `addressee` and broadcast a location query.
    ///
    /// If a lookup for the addressee is already outstanding the frame is
    /// dropped silently.
    pub async fn forward_remote(&self, addressee: PublicKey, frame: Frame, sender: SessionId) {
        let entry_id = self.next_entry.fetch_add(1, Ordering::Relaxed);
        match self.pending.entry(addressee) {
            Entry::Occupied(_) => {
                tracing::debug!(
                    addressee = %hex::encode(&addressee[..8]),
                    session = sender,
                    "lookup already pending, dropping frame"
                );
                return;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PendingQuery {
                    frame,
                    deadline: Instant::now() + self.query_timeout,
                    entry_id,
                    sender,
                });
            }
        }

        let pending = Arc::clone(&self.pending);
        let timeout = self.query_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = pending.remove_if(&addressee, |_, entry| entry.entry_id == entry_id);
            if expired.is_some() {
                tracing::debug!(
                    addressee = %hex::encode(&addressee[..8]),
                    "lookup expired, dropping parked frame"
                );
            }
        });

        let peers = self.directories.read().await.peers().open_sessions();
        if peers.is_empty() {
            tracing::debug!(
                addressee = %hex::encode(&addressee[..8]),
                "no open peer sessions to query"
            );
            return;
        }
        if let Some(query) = node_info_frame(self.own_key, &NodeInfo::QueryClient(addressee)) {
            for peer in &peers {
                peer.send(&query);
            }
            tracing::debug!(
                addressee = %hex::encode(&addressee[..8]),
                peers = peers.len(),
                "broadcast location query"
            );
        }
    }

    /// Consume a QUERY_RESPONSE. First response wins; responses for unknown
    /// addressees are ignored.
    pub async fn handle_response(&self, target: PublicKey, owner: Option<PublicKey>) {
        let Some((_, entry)) = self.pending.remove(&target) else {
            return;
        };

        let Some(owner) = owner else {
            tracing::debug!(
                addressee = %hex::encode(&target[..8]),
                "addressee not found in federation, dropping parked frame"
            );
            return;
        };

        let session = self.directories.read().await.peers().open_session(&owner);
        match session {
            Some(session) => {
                session.send(&entry.frame);
                tracing::debug!(
                    addressee = %hex::encode(&target[..8]),
                    owner = %hex::encode(&owner[..8]),
                    from_session = entry.sender,
                    "forwarded parked frame to owning peer"
                );
            }
            None => {
                tracing::debug!(
                    owner = %hex::encode(&owner[..8]),
                    "owning peer session gone, dropping parked frame"
                );
            }
        }
    }

    /// Whether a lookup for `addressee` is outstanding.
    pub fn is_pending(&self, addressee: &PublicKey) -> bool {
        self.pending.contains_key(addressee)
    }

    /// Number of outstanding lookups.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Every outstanding entry still has a future deadline. Diagnostic.
    pub fn all_within_deadline(&self) -> bool {
        let now = Instant::now();
        self.pending.iter().all(|entry| now < entry.deadline)
    }
}
