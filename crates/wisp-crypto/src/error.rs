//! Error types for WISP cryptographic operations.

use thiserror::Error;

/// Cryptographic and keystore errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Bytes do not represent a valid Ed25519 public key point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// A signature is malformed or does not authenticate the message.
    #[error("invalid signature")]
    InvalidSignature,

    /// A keystore file holds something other than a 64-character hex seed.
    #[error("malformed keystore file")]
    MalformedKeystore,

    /// Keystore I/O failure.
    #[error("keystore i/o: {0}")]
    Io(#[from] std::io::Error),
}
