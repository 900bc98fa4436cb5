//! Challenge/response session authentication.
//!
//! The same engine drives client and peer sessions. Each side emits a
//! 32-byte random challenge at session open; whichever side sees the other's
//! unsigned challenge first signs it in reply, and that signed reply is at
//! once the counter-party's proof. A side accepts a proof only when the
//! signed payload bytes-equal the exact challenge it emitted on this session,
//! which is what makes the exchange replay-resistant.
//!
//! Accepted inbound shapes:
//!
//! - 32-byte payload, signed: verify, match against our challenge, classify
//!   the session and install it into a directory, confirm with `[0x01]`
//! - 32-byte payload, unsigned: the other side's challenge; counter-sign it
//! - `[0x01]`: the other side's confirmation
//! - anything else (or any failure above): close the session

use crate::directory::Directories;
use crate::error::RelayError;
use crate::gossip::node_info_frame;
use crate::session::{Session, SessionId, SessionRole};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use wisp_crypto::sign::verify_raw;
use wisp_crypto::{generate_challenge, Identity, CHALLENGE_SIZE};
use wisp_proto::{Frame, FrameType, NodeInfo};

/// Confirmation byte sent once a proof is accepted.
pub const CONFIRM: u8 = 0x01;

/// Per-session authentication state.
struct PendingAuth {
    /// The challenge we emitted on this session.
    challenge: [u8; CHALLENGE_SIZE],
    /// Set for sessions this node dialed: the session is pre-marked as a
    /// peer and this is the URL the eventual peer record gets.
    dial_url: Option<String>,
}

/// The handshake engine: one pending challenge per unauthenticated session.
pub struct HandshakeEngine {
    identity: Arc<Identity>,
    pending: DashMap<SessionId, PendingAuth>,
}

impl HandshakeEngine {
    /// Create an engine signing with `identity`.
    pub fn new(identity: Arc<Identity>) -> Self {
        Self {
            identity,
            pending: DashMap::new(),
        }
    }

    /// Start authenticating a freshly opened session: record a challenge and
    /// send it. `dial_url` is set for outbound sessions, which are pre-marked
    /// as peers.
    pub fn begin(&self, session: &Session, dial_url: Option<String>) {
        let challenge = generate_challenge();
        self.pending.insert(
            session.id(),
            PendingAuth {
                challenge,
                dial_url,
            },
        );
        session.send(&Frame::new(FrameType::Handshake, challenge.to_vec()));
        tracing::debug!(session = session.id(), "sent challenge");
    }

    /// Drop the pending state for a session that went away.
    pub fn forget(&self, session: SessionId) {
        self.pending.remove(&session);
    }

    /// Process one inbound HANDSHAKE frame.
    ///
    /// # Errors
    ///
    /// Any error means the session must be closed: a failed verification, a
    /// challenge mismatch, a proof with no challenge outstanding, or an
    /// unrecognized payload shape.
    pub async fn handle(
        &self,
        directories: &RwLock<Directories>,
        session: &Arc<Session>,
        frame: &Frame,
    ) -> Result<(), RelayError> {
        let payload = frame.payload.as_slice();

        if payload.len() == CHALLENGE_SIZE && frame.has_signature() {
            return self.accept_proof(directories, session, frame).await;
        }

        if payload.len() == CHALLENGE_SIZE {
            // The other side's challenge, not yet signed by anyone: prove
            // ourselves over it. Our own recorded challenge stays armed.
            let signature = self.identity.sign(payload);
            session.send(
                &Frame::new(FrameType::Handshake, payload.to_vec())
                    .with_sender(*self.identity.public_key())
                    .with_signature(signature.to_bytes()),
            );
            return Ok(());
        }

        if matches!(payload, [b] if *b == CONFIRM) {
            return Ok(());
        }

        Err(RelayError::Auth("unexpected handshake shape"))
    }

    async fn accept_proof(
        &self,
        directories: &RwLock<Directories>,
        session: &Arc<Session>,
        frame: &Frame,
    ) -> Result<(), RelayError> {
        verify_raw(&frame.sender_id, &frame.payload, &frame.signature)?;

        let Some((_, pending)) = self.pending.remove(&session.id()) else {
            return Err(RelayError::Auth("no challenge outstanding"));
        };
        if frame.payload != pending.challenge {
            return Err(RelayError::Auth("challenge mismatch"));
        }

        let key = frame.sender_id;
        let own_key = *self.identity.public_key();
        let as_peer = {
            let mut dirs = directories.write().await;
            let as_peer = pending.dial_url.is_some() || dirs.peers().contains(&key);
            if as_peer {
                dirs.attach_peer(key, pending.dial_url, session.clone());
                session.set_role(SessionRole::Peer);
            } else {
                dirs.install_client(key, session.clone());
                session.set_role(SessionRole::Client);
            }
            as_peer
        };

        session.send(&Frame::new(FrameType::Handshake, vec![CONFIRM]).with_sender(own_key));

        if as_peer {
            tracing::info!(
                session = session.id(),
                peer = %hex::encode(&key[..8]),
                "peer authenticated"
            );
            // seed discovery from every fresh peer link
            if let Some(request) = node_info_frame(own_key, &NodeInfo::RequestServers) {
                session.send(&request);
            }
        } else {
            tracing::info!(
                session = session.id(),
                client = %hex::encode(&key[..8]),
                "client authenticated"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{next_frame, session_pair};

    fn engine() -> (HandshakeEngine, Arc<Identity>) {
        let identity = Arc::new(Identity::generate());
        (HandshakeEngine::new(identity.clone()), identity)
    }

    fn proof_for(challenge: &[u8], signer: &Identity) -> Frame {
        Frame::new(FrameType::Handshake, challenge.to_vec())
            .with_sender(*signer.public_key())
            .with_signature(signer.sign(challenge).to_bytes())
    }

    #[tokio::test]
    async fn test_begin_emits_anonymous_challenge() {
        let (engine, _) = engine();
        let (session, mut rx) = session_pair(1);

        engine.begin(&session, None);

        let challenge = next_frame(&mut rx).unwrap();
        assert_eq!(challenge.frame_type, FrameType::Handshake);
        assert_eq!(challenge.payload.len(), CHALLENGE_SIZE);
        assert!(!challenge.has_sender());
        assert!(!challenge.has_signature());
    }

    #[tokio::test]
    async fn test_valid_proof_installs_client_and_confirms() {
        let (engine, server) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, mut rx) = session_pair(1);
        let client = Identity::generate();

        engine.begin(&session, None);
        let challenge = next_frame(&mut rx).unwrap();

        engine
            .handle(&dirs, &session, &proof_for(&challenge.payload, &client))
            .await
            .unwrap();

        assert_eq!(session.role(), SessionRole::Client);
        assert!(dirs.read().await.clients().contains(client.public_key()));

        let confirm = next_frame(&mut rx).unwrap();
        assert_eq!(confirm.payload, vec![CONFIRM]);
        assert_eq!(confirm.sender_id, *server.public_key());
        assert!(!confirm.has_signature());
    }

    #[tokio::test]
    async fn test_dialed_session_authenticates_as_peer() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, mut rx) = session_pair(1);
        let peer = Identity::generate();

        engine.begin(&session, Some("ws://seed:8080".into()));
        let challenge = next_frame(&mut rx).unwrap();

        engine
            .handle(&dirs, &session, &proof_for(&challenge.payload, &peer))
            .await
            .unwrap();

        assert_eq!(session.role(), SessionRole::Peer);
        let guard = dirs.read().await;
        let record = guard.peers().get(peer.public_key()).unwrap();
        assert_eq!(record.address.as_deref(), Some("ws://seed:8080"));

        // confirmation, then discovery seeding
        let confirm = next_frame(&mut rx).unwrap();
        assert_eq!(confirm.payload, vec![CONFIRM]);
        let request = next_frame(&mut rx).unwrap();
        assert_eq!(request.frame_type, FrameType::NodeInfo);
        assert_eq!(
            NodeInfo::decode(&request.payload).unwrap(),
            NodeInfo::RequestServers
        );
    }

    #[tokio::test]
    async fn test_known_key_promotes_inbound_session_to_peer() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let peer = Identity::generate();
        dirs.write()
            .await
            .peers_mut()
            .insert_known(*peer.public_key(), "ws://known:1".into());

        let (session, mut rx) = session_pair(1);
        engine.begin(&session, None);
        let challenge = next_frame(&mut rx).unwrap();

        engine
            .handle(&dirs, &session, &proof_for(&challenge.payload, &peer))
            .await
            .unwrap();

        assert_eq!(session.role(), SessionRole::Peer);
        assert!(!dirs.read().await.clients().contains(peer.public_key()));
    }

    #[tokio::test]
    async fn test_challenge_mismatch_is_fatal() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, mut rx) = session_pair(1);
        let client = Identity::generate();

        engine.begin(&session, None);
        let _ = next_frame(&mut rx).unwrap();

        let wrong = [0xAAu8; CHALLENGE_SIZE];
        let result = engine.handle(&dirs, &session, &proof_for(&wrong, &client)).await;

        assert!(matches!(result, Err(RelayError::Auth(_))));
        assert!(dirs.read().await.clients().is_empty());
    }

    #[tokio::test]
    async fn test_bad_signature_is_fatal() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, mut rx) = session_pair(1);
        let client = Identity::generate();

        engine.begin(&session, None);
        let challenge = next_frame(&mut rx).unwrap();

        let mut proof = proof_for(&challenge.payload, &client);
        proof.signature[0] ^= 0xFF;

        assert!(engine.handle(&dirs, &session, &proof).await.is_err());
    }

    #[tokio::test]
    async fn test_proof_without_outstanding_challenge_is_fatal() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, _rx) = session_pair(1);
        let client = Identity::generate();

        let result = engine
            .handle(&dirs, &session, &proof_for(&[1u8; 32], &client))
            .await;
        assert!(matches!(result, Err(RelayError::Auth(_))));
    }

    #[tokio::test]
    async fn test_unsigned_challenge_is_counter_signed() {
        let (engine, server) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, mut rx) = session_pair(1);

        engine.begin(&session, None);
        let _ = next_frame(&mut rx).unwrap();

        let their_challenge = [7u8; CHALLENGE_SIZE];
        engine
            .handle(
                &dirs,
                &session,
                &Frame::new(FrameType::Handshake, their_challenge.to_vec()),
            )
            .await
            .unwrap();

        let reply = next_frame(&mut rx).unwrap();
        assert_eq!(reply.payload, their_challenge);
        assert_eq!(reply.sender_id, *server.public_key());
        assert!(verify_raw(server.public_key(), &their_challenge, &reply.signature).is_ok());

        // our own challenge must still be armed for their eventual proof
        assert!(engine.pending.contains_key(&session.id()));
    }

    #[tokio::test]
    async fn test_confirmation_is_accepted() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, _rx) = session_pair(1);

        let confirm = Frame::new(FrameType::Handshake, vec![CONFIRM]);
        assert!(engine.handle(&dirs, &session, &confirm).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_shape_is_fatal() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let (session, _rx) = session_pair(1);

        let garbage = Frame::new(FrameType::Handshake, vec![1, 2, 3]);
        assert!(matches!(
            engine.handle(&dirs, &session, &garbage).await,
            Err(RelayError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_reauth_same_key_displaces_old_session() {
        let (engine, _) = engine();
        let dirs = RwLock::new(Directories::new());
        let client = Identity::generate();

        let (first, mut first_rx) = session_pair(1);
        engine.begin(&first, None);
        let challenge = next_frame(&mut first_rx).unwrap();
        engine
            .handle(&dirs, &first, &proof_for(&challenge.payload, &client))
            .await
            .unwrap();

        let (second, mut second_rx) = session_pair(2);
        engine.begin(&second, None);
        let challenge = next_frame(&mut second_rx).unwrap();
        engine
            .handle(&dirs, &second, &proof_for(&challenge.payload, &client))
            .await
            .unwrap();

        let guard = dirs.read().await;
        assert_eq!(guard.clients().get(client.public_key()).unwrap().session.id(), 2);
        assert!(!first.is_open());
    }
}
