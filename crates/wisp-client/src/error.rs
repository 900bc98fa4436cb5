//! Client SDK errors.

use thiserror::Error;

/// Errors surfaced by [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// WebSocket connect or transport failure.
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] wisp_crypto::CryptoError),

    /// A gossip payload could not be encoded.
    #[error(transparent)]
    Gossip(#[from] wisp_proto::GossipError),

    /// The session is gone; no more frames can be sent.
    #[error("connection closed")]
    Closed,
}
