//! On-disk persistence for client identities.
//!
//! A keystore file is the 64-character lowercase hex encoding of the 32-byte
//! Ed25519 seed, with a trailing newline. Relay nodes never use this; it
//! exists so a client keeps a stable public key across runs.

use crate::error::CryptoError;
use crate::identity::Identity;
use crate::sign::SigningKey;
use crate::PUBLIC_KEY_SIZE;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Handle to one keystore file.
#[derive(Debug, Clone)]
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    /// Point at a keystore file. Nothing is read until [`Keystore::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this keystore reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the identity stored in the file.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Io`] if the file cannot be read,
    /// [`CryptoError::MalformedKeystore`] if it is not a 64-character hex seed.
    pub fn load(&self) -> Result<Identity, CryptoError> {
        let mut text = std::fs::read_to_string(&self.path)?;
        let trimmed = text.trim();

        let mut seed = [0u8; PUBLIC_KEY_SIZE];
        let result = hex::decode_to_slice(trimmed, &mut seed);
        text.zeroize();
        if result.is_err() {
            seed.zeroize();
            return Err(CryptoError::MalformedKeystore);
        }

        let identity = Identity::from_signing_key(SigningKey::from_bytes(&seed));
        seed.zeroize();
        Ok(identity)
    }

    /// Write an identity's seed to the file, creating parent directories.
    ///
    /// On unix the file is created with `0600` permissions.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Io`] on any filesystem failure.
    pub fn save(&self, identity: &Identity) -> Result<(), CryptoError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut encoded = hex::encode(identity.signing_key().to_bytes());
        encoded.push('\n');
        let result = write_private(&self.path, encoded.as_bytes());
        encoded.zeroize();
        result?;
        Ok(())
    }

    /// Load the identity, or generate and save a fresh one if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Propagates [`Keystore::load`] and [`Keystore::save`] failures; a
    /// malformed existing file is an error, not something to overwrite.
    pub fn load_or_generate(&self) -> Result<Identity, CryptoError> {
        if self.path.exists() {
            return self.load();
        }
        let identity = Identity::generate();
        self.save(&identity)?;
        Ok(identity)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
