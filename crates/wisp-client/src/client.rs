//! The connected client.
//!
//! The authentication exchange mirrors the relay's: both sides emit a
//! 32-byte challenge at connect; an unsigned 32-byte payload from the relay
//! is counter-signed with our key, a signed one is the relay proving itself
//! over our challenge, and `[0x01]` completes authentication.

use crate::error::ClientError;
use crate::event::Event;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wisp_crypto::sign::verify_raw;
use wisp_crypto::{generate_challenge, Identity, PublicKey, CHALLENGE_SIZE, SIGNATURE_SIZE};
use wisp_proto::{Frame, FrameType, NodeInfo};

const CONFIRM: u8 = 0x01;

/// A client session against one relay.
pub struct Client {
    identity: Arc<Identity>,
    tx: mpsc::UnboundedSender<Message>,
    relay_key: Arc<OnceLock<PublicKey>>,
}

impl Client {
    /// Connect to a relay and start authenticating as `identity`.
    ///
    /// Returns immediately after the WebSocket is established; wait for
    /// [`Event::Authenticated`] on the returned channel before sending.
    ///
    /// # Errors
    ///
    /// [`ClientError::WebSocket`] when the connection cannot be established.
    pub async fn connect(
        url: &str,
        identity: Identity,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>), ClientError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        let identity = Arc::new(identity);
        let (tx, mut command_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
        let relay_key = Arc::new(OnceLock::new());

        let (mut sink, mut stream) = ws.split();

        tokio::spawn(async move {
            while let Some(message) = command_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() {
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // our side of the mutual challenge goes out first
        let challenge = generate_challenge();
        let _ = tx.send(Message::Binary(
            Frame::new(FrameType::Handshake, challenge.to_vec()).encode(),
        ));

        let reader_identity = Arc::clone(&identity);
        let reader_tx = tx.clone();
        let reader_relay_key = Arc::clone(&relay_key);
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Binary(data)) => {
                        let frame = match Frame::decode(&data) {
                            Ok(frame) => frame,
                            Err(err) => {
                                tracing::warn!("frame decode failed, closing: {err}");
                                break;
                            }
                        };
                        if !process_frame(
                            &reader_identity,
                            &reader_tx,
                            &reader_relay_key,
                            &event_tx,
                            &challenge,
                            frame,
                        ) {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!("read error: {err}");
                        break;
                    }
                }
            }
            let _ = event_tx.send(Event::Closed);
            let _ = reader_tx.send(Message::Close(None));
        });

        Ok((
            Self {
                identity,
                tx,
                relay_key,
            },
            event_rx,
        ))
    }

    /// Our public key.
    pub fn public_key(&self) -> &PublicKey {
        self.identity.public_key()
    }

    /// The relay's public key, once it has proven itself.
    pub fn relay_key(&self) -> Option<PublicKey> {
        self.relay_key.get().copied()
    }

    /// Send an opaque message to `to`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Closed`] when the session is gone.
    pub fn send(&self, to: &PublicKey, content: &[u8]) -> Result<(), ClientError> {
        let mut payload = to.to_vec();
        payload.extend_from_slice(content);
        self.send_frame(Frame::new(FrameType::Data, payload).with_sender(*self.public_key()))
    }

    /// Send a message to `to` carrying an end-to-end signature over the
    /// content, verifiable by the receiving client. The relay never checks
    /// it.
    ///
    /// # Errors
    ///
    /// [`ClientError::Closed`] when the session is gone.
    pub fn send_signed(&self, to: &PublicKey, content: &[u8]) -> Result<(), ClientError> {
        let signature = self.identity.sign(content);
        let mut payload = to.to_vec();
        payload.extend_from_slice(&signature.to_bytes());
        payload.extend_from_slice(content);
        self.send_frame(Frame::new(FrameType::SignedData, payload).with_sender(*self.public_key()))
    }

    /// Ask the relay for its known-peer list; the answer arrives as
    /// [`Event::ServerList`].
    ///
    /// # Errors
    ///
    /// [`ClientError::Closed`] when the session is gone.
    pub fn request_servers(&self) -> Result<(), ClientError> {
        self.send_node_info(&NodeInfo::RequestServers)
    }

    /// Ask the relay to dial another relay.
    ///
    /// # Errors
    ///
    /// [`ClientError::Gossip`] if the URL does not fit the wire format,
    /// [`ClientError::Closed`] when the session is gone.
    pub fn add_server(&self, url: &str) -> Result<(), ClientError> {
        self.send_node_info(&NodeInfo::AddServer(url.to_string()))
    }

    /// Close the session.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }

    fn send_node_info(&self, info: &NodeInfo) -> Result<(), ClientError> {
        let payload = info.encode()?;
        self.send_frame(Frame::new(FrameType::NodeInfo, payload).with_sender(*self.public_key()))
    }

    fn send_frame(&self, frame: Frame) -> Result<(), ClientError> {
        self.tx
            .send(Message::Binary(frame.encode()))
            .map_err(|_| ClientError::Closed)
    }
}

/// Handle one inbound frame. Returns false when the session must end.
fn process_frame(
    identity: &Identity,
    tx: &mpsc::UnboundedSender<Message>,
    relay_key: &OnceLock<PublicKey>,
    events: &mpsc::UnboundedSender<Event>,
    challenge: &[u8; CHALLENGE_SIZE],
    frame: Frame,
) -> bool {
    match frame.frame_type {
        FrameType::Handshake => {
            let payload = frame.payload.as_slice();

            if payload.len() == CHALLENGE_SIZE && frame.has_signature() {
                // the relay proving itself over our challenge
                if verify_raw(&frame.sender_id, payload, &frame.signature).is_err() {
                    tracing::warn!("relay proof failed verification, closing");
                    return false;
                }
                if payload != challenge {
                    tracing::warn!("relay signed a foreign challenge, closing");
                    return false;
                }
                let _ = relay_key.set(frame.sender_id);
                return true;
            }

            if payload.len() == CHALLENGE_SIZE {
                // the relay's challenge: prove ourselves over it
                let signature = identity.sign(payload);
                let proof = Frame::new(FrameType::Handshake, payload.to_vec())
                    .with_sender(*identity.public_key())
                    .with_signature(signature.to_bytes());
                let _ = tx.send(Message::Binary(proof.encode()));
                return true;
            }

            if matches!(payload, [b] if *b == CONFIRM) {
                let relay = relay_key.get().copied().unwrap_or([0u8; 32]);
                let _ = events.send(Event::Authenticated { relay });
                return true;
            }

            tracing::warn!("unexpected handshake shape from relay, closing");
            false
        }

        FrameType::Data => {
            let _ = events.send(Event::Message {
                sender: frame.sender_id,
                content: frame.payload,
                signed: false,
            });
            true
        }

        FrameType::SignedData => {
            // addressee already stripped by the relay: signature || content
            if frame.payload.len() < SIGNATURE_SIZE {
                tracing::warn!("signed message shorter than its signature, dropping");
                return true;
            }
            let (signature, content) = frame.payload.split_at(SIGNATURE_SIZE);
            let mut sig_bytes = [0u8; SIGNATURE_SIZE];
            sig_bytes.copy_from_slice(signature);

            match verify_raw(&frame.sender_id, content, &sig_bytes) {
                Ok(()) => {
                    let _ = events.send(Event::Message {
                        sender: frame.sender_id,
                        content: content.to_vec(),
                        signed: true,
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        sender = %hex::encode(&frame.sender_id[..8]),
                        "signed message failed verification, dropping"
                    );
                }
            }
            true
        }

        FrameType::NodeInfo => {
            match NodeInfo::decode(&frame.payload) {
                Ok(NodeInfo::ResponseServers(adverts)) => {
                    let _ = events.send(Event::ServerList(adverts));
                }
                Ok(other) => {
                    tracing::debug!(subtype = other.subtype(), "ignoring node-info");
                }
                Err(err) => {
                    tracing::warn!("malformed node-info from relay, dropping: {err}");
                }
            }
            true
        }
    }
}
