//! # WISP Crypto
//!
//! Cryptographic identity for WISP nodes and clients.
//!
//! This crate provides:
//! - **Ed25519 wrappers**: signing/verifying keys and 64-byte signatures
//!   with fixed-size byte conversions ([`sign`])
//! - **Identity**: one keypair identifying a node or client by its 32-byte
//!   public key ([`identity`])
//! - **Challenges**: the 32 random bytes each side emits at session open
//!   ([`challenge`])
//! - **Keystore**: opt-in on-disk persistence of a client seed ([`keystore`])
//!
//! Relay identities are generated fresh at startup and never persisted; the
//! keystore exists so a *client* can keep a stable address across runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod challenge;
pub mod error;
pub mod identity;
pub mod keystore;
pub mod sign;

pub use challenge::generate_challenge;
pub use error::CryptoError;
pub use identity::{Identity, PublicKey};
pub use keystore::Keystore;
pub use sign::{Signature, SigningKey, VerifyingKey};

/// Size of a public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of a session challenge in bytes.
pub const CHALLENGE_SIZE: usize = 32;
