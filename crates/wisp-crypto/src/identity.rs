//! Identity of a WISP node or client.
//!
//! An identity is one Ed25519 keypair; the 32-byte public key is the
//! identity's address everywhere in the protocol. Relay nodes generate a
//! fresh identity at startup, clients may load one from the keystore.

use crate::sign::{Signature, SigningKey, VerifyingKey};
use crate::PUBLIC_KEY_SIZE;
use rand_core::OsRng;

/// A 32-byte Ed25519 public key, the protocol's universal address.
pub type PublicKey = [u8; PUBLIC_KEY_SIZE];

/// An Ed25519 keypair identifying one node or client.
pub struct Identity {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Identity {
    /// Generate a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Build an identity around an existing signing key.
    #[must_use]
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = signing_key.verifying_key().to_bytes();
        Self {
            signing_key,
            public_key,
        }
    }

    /// The public key identifying this identity.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign a message with this identity's private key.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// The verifying half of the keypair.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Borrow the signing key (for keystore export).
    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &hex::encode(&self.public_key[..8]))
            .finish_non_exhaustive()
    }
}
