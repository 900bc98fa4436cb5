//! Events delivered by the SDK.

use wisp_crypto::PublicKey;
use wisp_proto::ServerAdvert;

/// Everything a connected client can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The relay accepted our proof. `relay` is the relay's public key as
    /// learned from its own signed handshake.
    Authenticated {
        /// The relay's public key.
        relay: PublicKey,
    },

    /// A frame addressed to us was delivered. The addressee prefix is
    /// already stripped; `content` starts at the first payload byte.
    /// `signed` is true only for SIGNED_DATA whose end-to-end signature
    /// verified against `sender`; unverifiable signed messages are dropped
    /// before reaching this channel.
    Message {
        /// The original sender's public key, preserved across the federation.
        sender: PublicKey,
        /// Message content.
        content: Vec<u8>,
        /// Whether an end-to-end signature was present and valid.
        signed: bool,
    },

    /// The relay answered a [`crate::Client::request_servers`] call.
    ServerList(Vec<ServerAdvert>),

    /// The session ended.
    Closed,
}
