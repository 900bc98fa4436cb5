//! Data frame routing.
//!
//! The first 32 payload bytes of a DATA or SIGNED_DATA frame name the
//! addressee. A local addressee with an open session gets the frame
//! immediately, with the addressee prefix stripped; anything else is handed
//! to the locator. The router never sends to peers itself, so duplicate
//! suppression and deadlines live in one place.

use crate::directory::Directories;
use crate::error::RelayError;
use crate::locator::Locator;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::RwLock;
use wisp_crypto::PublicKey;
use wisp_proto::{Frame, KEY_SIZE};

/// Routes authenticated data frames.
pub struct DataRouter {
    directories: Arc<RwLock<Directories>>,
    locator: Arc<Locator>,
}

impl DataRouter {
    /// Create a router over the shared directories and locator.
    pub fn new(directories: Arc<RwLock<Directories>>, locator: Arc<Locator>) -> Self {
        Self {
            directories,
            locator,
        }
    }

    /// Route one DATA or SIGNED_DATA frame from an authenticated session.
    ///
    /// # Errors
    ///
    /// Never fails today; malformed payloads are dropped with a warning and
    /// the session stays open.
    pub async fn route(&self, session: &Arc<Session>, frame: Frame) -> Result<(), RelayError> {
        if frame.payload.len() < KEY_SIZE {
            tracing::warn!(
                session = session.id(),
                len = frame.payload.len(),
                "data payload shorter than an addressee key, dropping"
            );
            return Ok(());
        }

        let mut addressee: PublicKey = [0u8; KEY_SIZE];
        addressee.copy_from_slice(&frame.payload[..KEY_SIZE]);

        {
            let dirs = self.directories.read().await;
            if let Some(record) = dirs.clients().get(&addressee) {
                if record.session.is_open() {
                    // strip the addressee prefix, keep the sender verbatim
                    let delivery = Frame::new(frame.frame_type, frame.payload[KEY_SIZE..].to_vec())
                        .with_sender(frame.sender_id);
                    record.session.send(&delivery);
                    tracing::debug!(
                        session = session.id(),
                        addressee = %hex::encode(&addressee[..8]),
                        "delivered locally"
                    );
                    return Ok(());
                }
            }
        }

        self.locator
            .forward_remote(addressee, frame, session.id())
            .await;
        Ok(())
    }
}
