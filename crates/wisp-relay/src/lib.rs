//! # WISP Relay
//!
//! The relay node at the core of a WISP federation.
//!
//! A node accepts WebSocket sessions from clients and from peer relay nodes,
//! authenticates each with a challenge/response exchange over Ed25519 keys,
//! and routes opaque data frames: directly when the addressee is a local
//! client, otherwise by broadcasting a one-hop location query to its peers,
//! parking the frame until a peer claims the addressee, and forwarding it
//! over the peer link.
//!
//! Module map, leaves first:
//!
//! - [`session`]: one bidirectional binary stream with a role and a send queue
//! - [`directory`]: the local-client and known-peer tables
//! - [`handshake`]: the challenge/response engine shared by client and peer
//!   sessions
//! - [`dispatch`]: frame-type routing
//! - [`router`]: local delivery fast path
//! - [`locator`]: pending-query table and federated lookup
//! - [`gossip`]: peer discovery and the node-info subprotocol
//! - [`transport`]: WebSocket listener, dialer, and per-session tasks
//! - [`node`]: construction and the run loop

#![warn(clippy::all)]

pub mod config;
pub mod directory;
pub mod error;
pub mod gossip;
pub mod handshake;
pub mod locator;
pub mod node;
pub mod router;
pub mod session;
pub mod transport;

mod dispatch;

pub use config::RelayConfig;
pub use error::RelayError;
pub use node::RelayNode;
pub use session::{Session, SessionId, SessionRole};
