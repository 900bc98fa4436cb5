//! The two node directories: local clients and known peers.
//!
//! Each directory is a bidirectional mapping: public key to record, plus a
//! reverse index from session identity to key. Both live in one
//! [`Directories`] value behind a single lock, because the handshake engine's
//! eviction rules span them (a key never appears in both at once).
//!
//! Replacement closes the displaced session before the new record lands, so
//! no reader of the table ever observes two live sessions for one key.

use crate::session::{Session, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use wisp_crypto::PublicKey;
use wisp_proto::ServerAdvert;

/// One authenticated local client.
pub struct ClientRecord {
    /// The session this client is connected over.
    pub session: Arc<Session>,
    /// When the client authenticated.
    pub authenticated_at: Instant,
}

/// One known peer relay node.
///
/// A record without a session is a "known-about" entry kept for re-dial and
/// discovery deduplication. An address of `None` means the peer was only ever
/// seen inbound and cannot be dialed.
pub struct PeerRecord {
    /// The URL this peer can be dialed at, if known.
    pub address: Option<String>,
    /// The live session, if one is attached.
    pub session: Option<Arc<Session>>,
}

impl PeerRecord {
    /// The address rendered for gossip, `"unknown"` when absent.
    pub fn address_or_unknown(&self) -> &str {
        self.address.as_deref().unwrap_or("unknown")
    }
}

/// The local-client table.
#[derive(Default)]
pub struct ClientTable {
    by_key: HashMap<PublicKey, ClientRecord>,
    by_session: HashMap<SessionId, PublicKey>,
}

impl ClientTable {
    /// Insert or replace the record for `key`. A displaced distinct session
    /// is closed before the new record becomes visible.
    pub fn insert(&mut self, key: PublicKey, session: Arc<Session>) {
        if let Some(old) = self.by_key.remove(&key) {
            self.by_session.remove(&old.session.id());
            if old.session.id() != session.id() {
                old.session.close();
            }
        }
        self.by_session.insert(session.id(), key);
        self.by_key.insert(
            key,
            ClientRecord {
                session,
                authenticated_at: Instant::now(),
            },
        );
    }

    /// Look up a client by key.
    pub fn get(&self, key: &PublicKey) -> Option<&ClientRecord> {
        self.by_key.get(key)
    }

    /// Whether `key` is a local client.
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// The key authenticated on `session`, if any.
    pub fn key_of_session(&self, session: SessionId) -> Option<&PublicKey> {
        self.by_session.get(&session)
    }

    /// Remove the record owned by `session`, returning its key.
    pub fn remove_by_session(&mut self, session: SessionId) -> Option<PublicKey> {
        let key = self.by_session.remove(&session)?;
        self.by_key.remove(&key);
        Some(key)
    }

    /// Remove a record by key, returning it.
    pub fn remove_by_key(&mut self, key: &PublicKey) -> Option<ClientRecord> {
        let record = self.by_key.remove(key)?;
        self.by_session.remove(&record.session.id());
        Some(record)
    }

    /// Number of authenticated clients.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// The known-peer table.
#[derive(Default)]
pub struct PeerTable {
    by_key: HashMap<PublicKey, PeerRecord>,
    by_session: HashMap<SessionId, PublicKey>,
}

impl PeerTable {
    /// Record a peer learned through discovery, without a session. Existing
    /// entries are left untouched. Returns whether a record was created.
    pub fn insert_known(&mut self, key: PublicKey, address: String) -> bool {
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(
            key,
            PeerRecord {
                address: Some(address),
                session: None,
            },
        );
        true
    }

    /// Attach an authenticated session to `key`, creating the record if
    /// needed. A previously attached distinct session is closed first; a
    /// previously known address is preserved when `dial_url` brings none.
    pub fn attach(&mut self, key: PublicKey, dial_url: Option<String>, session: Arc<Session>) {
        let record = self.by_key.entry(key).or_insert(PeerRecord {
            address: None,
            session: None,
        });
        if let Some(old) = record.session.take() {
            self.by_session.remove(&old.id());
            if old.id() != session.id() {
                old.close();
            }
        }
        if record.address.is_none() {
            record.address = dial_url;
        }
        self.by_session.insert(session.id(), key);
        record.session = Some(session);
    }

    /// Look up a peer by key.
    pub fn get(&self, key: &PublicKey) -> Option<&PeerRecord> {
        self.by_key.get(key)
    }

    /// Whether `key` is a known peer (with or without a session).
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// The open session attached to `key`, if any.
    pub fn open_session(&self, key: &PublicKey) -> Option<Arc<Session>> {
        self.by_key
            .get(key)?
            .session
            .as_ref()
            .filter(|s| s.is_open())
            .cloned()
    }

    /// The key authenticated on `session`, if any.
    pub fn key_of_session(&self, session: SessionId) -> Option<&PublicKey> {
        self.by_session.get(&session)
    }

    /// Detach the session from whichever record holds it. The record is
    /// retained when its address is still dial-able, dropped otherwise.
    /// Returns the affected key.
    pub fn detach_session(&mut self, session: SessionId) -> Option<PublicKey> {
        let key = self.by_session.remove(&session)?;
        if let Some(record) = self.by_key.get_mut(&key) {
            record.session = None;
            if record.address.is_none() {
                self.by_key.remove(&key);
            }
        }
        Some(key)
    }

    /// Whether any record carries exactly this address.
    pub fn has_address(&self, address: &str) -> bool {
        self.by_key
            .values()
            .any(|record| record.address.as_deref() == Some(address))
    }

    /// Every dial-able peer as a gossip advert. Sessionless entries are
    /// included; address-less entries are not.
    pub fn adverts(&self) -> Vec<ServerAdvert> {
        self.by_key
            .iter()
            .filter_map(|(key, record)| {
                record.address.as_ref().map(|address| ServerAdvert {
                    key: *key,
                    address: address.clone(),
                })
            })
            .collect()
    }

    /// Every currently open peer session.
    pub fn open_sessions(&self) -> Vec<Arc<Session>> {
        self.by_key
            .values()
            .filter_map(|record| record.session.as_ref())
            .filter(|session| session.is_open())
            .cloned()
            .collect()
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Both directories, mutated together under one lock.
#[derive(Default)]
pub struct Directories {
    clients: ClientTable,
    peers: PeerTable,
}

impl Directories {
    /// Fresh empty directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// The local-client table.
    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    /// The known-peer table.
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Mutable access for close handling.
    pub fn clients_mut(&mut self) -> &mut ClientTable {
        &mut self.clients
    }

    /// Mutable access for discovery bookkeeping.
    pub fn peers_mut(&mut self) -> &mut PeerTable {
        &mut self.peers
    }

    /// Install an authenticated client, displacing any prior record for the
    /// same key (its session is closed first).
    pub fn install_client(&mut self, key: PublicKey, session: Arc<Session>) {
        self.clients.insert(key, session);
    }

    /// Attach an authenticated peer session. A client record for the same
    /// key is evicted (and its session closed) before the peer record
    /// becomes visible, so no key is ever both client and peer.
    pub fn attach_peer(&mut self, key: PublicKey, dial_url: Option<String>, session: Arc<Session>) {
        if let Some(evicted) = self.clients.remove_by_key(&key) {
            if evicted.session.id() != session.id() {
                evicted.session.close();
            }
        }
        self.peers.attach(key, dial_url, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{saw_close, session_pair};

    fn key(tag: u8) -> PublicKey {
        [tag; 32]
    }

    #[test]
    fn test_client_insert_and_lookup() {
        let mut dirs = Directories::new();
        let (session, _rx) = session_pair(1);

        dirs.install_client(key(1), session.clone());

        assert!(dirs.clients().contains(&key(1)));
        assert_eq!(dirs.clients().key_of_session(1), Some(&key(1)));
        assert_eq!(dirs.clients().get(&key(1)).unwrap().session.id(), 1);
    }

    #[test]
    fn test_client_reauth_closes_displaced_session() {
        let mut dirs = Directories::new();
        let (old, mut old_rx) = session_pair(1);
        let (new, _rx) = session_pair(2);

        dirs.install_client(key(1), old);
        dirs.install_client(key(1), new);

        assert!(saw_close(&mut old_rx));
        assert_eq!(dirs.clients().get(&key(1)).unwrap().session.id(), 2);
        // reverse index follows the replacement
        assert_eq!(dirs.clients().key_of_session(1), None);
        assert_eq!(dirs.clients().key_of_session(2), Some(&key(1)));
    }

    #[test]
    fn test_client_remove_by_session() {
        let mut dirs = Directories::new();
        let (session, _rx) = session_pair(7);
        dirs.install_client(key(3), session);

        assert_eq!(dirs.clients_mut().remove_by_session(7), Some(key(3)));
        assert!(dirs.clients().is_empty());
        assert_eq!(dirs.clients().key_of_session(7), None);
    }

    #[test]
    fn test_peer_attach_preserves_discovered_address() {
        let mut dirs = Directories::new();
        dirs.peers_mut().insert_known(key(2), "ws://known:1".into());

        let (session, _rx) = session_pair(1);
        dirs.attach_peer(key(2), None, session);

        let record = dirs.peers().get(&key(2)).unwrap();
        assert_eq!(record.address.as_deref(), Some("ws://known:1"));
        assert!(record.session.is_some());
    }

    #[test]
    fn test_peer_attach_keeps_prior_address_over_dial_url() {
        let mut dirs = Directories::new();
        dirs.peers_mut().insert_known(key(2), "ws://first:1".into());

        let (session, _rx) = session_pair(1);
        dirs.attach_peer(key(2), Some("ws://second:2".into()), session);

        assert_eq!(
            dirs.peers().get(&key(2)).unwrap().address.as_deref(),
            Some("ws://first:1")
        );
    }

    #[test]
    fn test_peer_reattach_closes_old_session() {
        let mut dirs = Directories::new();
        let (old, mut old_rx) = session_pair(1);
        let (new, _rx) = session_pair(2);

        dirs.attach_peer(key(2), Some("ws://p:1".into()), old);
        dirs.attach_peer(key(2), None, new);

        assert!(saw_close(&mut old_rx));
        assert_eq!(
            dirs.peers().get(&key(2)).unwrap().session.as_ref().unwrap().id(),
            2
        );
    }

    #[test]
    fn test_peer_promotion_evicts_client_record() {
        let mut dirs = Directories::new();
        let (client_session, mut client_rx) = session_pair(1);
        let (peer_session, _rx) = session_pair(2);

        dirs.install_client(key(5), client_session);
        dirs.attach_peer(key(5), None, peer_session);

        assert!(saw_close(&mut client_rx));
        assert!(!dirs.clients().contains(&key(5)));
        assert!(dirs.peers().contains(&key(5)));
    }

    #[test]
    fn test_detach_retains_dialable_record() {
        let mut dirs = Directories::new();
        let (session, _rx) = session_pair(9);
        dirs.attach_peer(key(4), Some("ws://p:4".into()), session);

        assert_eq!(dirs.peers_mut().detach_session(9), Some(key(4)));

        let record = dirs.peers().get(&key(4)).unwrap();
        assert!(record.session.is_none());
        assert_eq!(record.address.as_deref(), Some("ws://p:4"));
    }

    #[test]
    fn test_detach_drops_addressless_record() {
        let mut dirs = Directories::new();
        let (session, _rx) = session_pair(9);
        dirs.attach_peer(key(4), None, session);

        dirs.peers_mut().detach_session(9);
        assert!(!dirs.peers().contains(&key(4)));
    }

    #[test]
    fn test_adverts_skip_addressless_peers() {
        let mut dirs = Directories::new();
        let (session, _rx) = session_pair(1);
        dirs.attach_peer(key(1), None, session);
        dirs.peers_mut().insert_known(key(2), "ws://p:2".into());

        let adverts = dirs.peers().adverts();
        assert_eq!(adverts.len(), 1);
        assert_eq!(adverts[0].key, key(2));
    }

    #[test]
    fn test_open_sessions_excludes_closed() {
        let mut dirs = Directories::new();
        let (open, _rx1) = session_pair(1);
        let (closed, _rx2) = session_pair(2);
        closed.close();

        dirs.attach_peer(key(1), Some("ws://a:1".into()), open);
        dirs.attach_peer(key(2), Some("ws://b:2".into()), closed);

        let sessions = dirs.peers().open_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id(), 1);
    }

    #[test]
    fn test_insert_known_does_not_overwrite() {
        let mut dirs = Directories::new();
        assert!(dirs.peers_mut().insert_known(key(1), "ws://a:1".into()));
        assert!(!dirs.peers_mut().insert_known(key(1), "ws://b:2".into()));
        assert_eq!(
            dirs.peers().get(&key(1)).unwrap().address.as_deref(),
            Some("ws://a:1")
        );
    }

    #[test]
    fn test_has_address() {
        let mut dirs = Directories::new();
        dirs.peers_mut().insert_known(key(1), "ws://a:1".into());
        assert!(dirs.peers().has_address("ws://a:1"));
        assert!(!dirs.peers().has_address("ws://a:2"));
    }
}
