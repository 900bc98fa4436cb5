//! Error types for the relay node.

use thiserror::Error;

/// Relay node errors.
///
/// Only [`RelayError::Bind`] is fatal; everything else is scoped to one
/// session or one frame.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listener could not be bound at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// WebSocket transport failure on one session.
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be decoded; the session is closed.
    #[error(transparent)]
    Frame(#[from] wisp_proto::FrameError),

    /// A session failed authentication and is closed.
    #[error("authentication failed: {0}")]
    Auth(&'static str),

    /// Cryptographic failure (invalid key or signature).
    #[error(transparent)]
    Crypto(#[from] wisp_crypto::CryptoError),
}
