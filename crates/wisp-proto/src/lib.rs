//! # WISP Wire Protocol
//!
//! Frame and payload codecs for the WISP relay protocol.
//!
//! This crate provides:
//! - **Frame codec**: the fixed 120-byte-header binary frame carried over
//!   each WebSocket message ([`frame`])
//! - **Node-info codec**: the gossip payload bodies used for peer discovery
//!   and addressee location ([`gossip`])
//! - **Error types**: decode failures split by layer ([`error`])
//!
//! Every multi-byte integer on the wire is big-endian. A frame is exactly a
//! header followed by `payload_len` payload bytes; the transport delivers one
//! frame per message, so the codec never has to reassemble across reads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod frame;
pub mod gossip;

pub use error::{FrameError, GossipError};
pub use frame::{Frame, FrameType};
pub use gossip::{NodeInfo, ServerAdvert};

/// First byte of every frame.
pub const MAGIC: u8 = 0x58;

/// Protocol version written into every frame header. Not enforced on decode.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Fixed frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 120;

/// Size of a public key (and of the addressee prefix on data payloads).
pub const KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature.
pub const SIGNATURE_SIZE: usize = 64;
