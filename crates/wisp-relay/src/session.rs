//! Session handles.
//!
//! A [`Session`] is the core's view of one bidirectional binary stream: an
//! identifier for logs, a role that the handshake engine assigns, an open
//! flag, and a send queue drained by the session's writer task. Frames sent
//! on one session reach the wire in the order the core submitted them.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wisp_proto::Frame;

/// Opaque session identifier, unique for the lifetime of the process.
pub type SessionId = u64;

/// What a session has authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionRole {
    /// Connected, not yet authenticated.
    Unset = 0,
    /// Authenticated end user.
    Client = 1,
    /// Authenticated relay node.
    Peer = 2,
}

impl SessionRole {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Client,
            2 => Self::Peer,
            _ => Self::Unset,
        }
    }
}

/// Handle to one live transport session.
pub struct Session {
    id: SessionId,
    tx: mpsc::UnboundedSender<Message>,
    open: AtomicBool,
    role: AtomicU8,
}

impl Session {
    /// Wrap a writer-task queue into a session handle.
    pub(crate) fn new(id: SessionId, tx: mpsc::UnboundedSender<Message>) -> Arc<Self> {
        Arc::new(Self {
            id,
            tx,
            open: AtomicBool::new(true),
            role: AtomicU8::new(SessionRole::Unset as u8),
        })
    }

    /// This session's log identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current classification.
    pub fn role(&self) -> SessionRole {
        SessionRole::from_u8(self.role.load(Ordering::Acquire))
    }

    pub(crate) fn set_role(&self, role: SessionRole) {
        self.role.store(role as u8, Ordering::Release);
    }

    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Enqueue one frame. Sends on a closed session are discarded.
    pub fn send(&self, frame: &Frame) {
        if !self.is_open() {
            return;
        }
        // a full/gone writer task means the session is already dying
        let _ = self.tx.send(Message::Binary(frame.encode()));
    }

    /// Close the session: mark it closed and queue a WebSocket close.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(Message::Close(None));
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.role())
            .field("open", &self.is_open())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use wisp_proto::FrameType;

    #[test]
    fn test_new_session_is_open_and_unset() {
        let (session, _rx) = session_pair(1);
        assert!(session.is_open());
        assert_eq!(session.role(), SessionRole::Unset);
    }

    #[test]
    fn test_send_queues_encoded_frame() {
        let (session, mut rx) = session_pair(2);
        session.send(&Frame::new(FrameType::Data, b"abc".to_vec()));

        let frame = next_frame(&mut rx).unwrap();
        assert_eq!(frame.payload, b"abc");
    }

    #[test]
    fn test_send_after_close_is_discarded() {
        let (session, mut rx) = session_pair(3);
        session.close();
        session.send(&Frame::new(FrameType::Data, Vec::new()));

        assert!(saw_close(&mut rx));
        assert!(next_frame(&mut rx).is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (session, mut rx) = session_pair(4);
        session.close();
        session.close();

        assert!(saw_close(&mut rx));
        // second close queued nothing further
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_role_transitions() {
        let (session, _rx) = session_pair(5);
        session.set_role(SessionRole::Peer);
        assert_eq!(session.role(), SessionRole::Peer);
    }
}
