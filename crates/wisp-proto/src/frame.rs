//! Frame encoding and decoding for the WISP wire protocol.
//!
//! Every frame is a fixed 120-byte header followed by `payload_len` bytes of
//! payload. All multi-byte fields are big-endian (network byte order).
//!
//! Header layout:
//!
//! ```text
//! offset  size  field
//!      0     1  magic (0x58)
//!      1     1  version
//!      2     1  type
//!      3     1  flags (reserved, zero)
//!      4     4  payload_len (u32)
//!      8    16  msg_id (reserved, zero)
//!     24    32  sender_id (all-zero = not yet known)
//!     56    64  signature (all-zero = unsigned)
//!    120     n  payload
//! ```
//!
//! Decoding produces an owned [`Frame`] whose payload has its own backing
//! storage, so a decoded frame can be parked (e.g. behind a federated lookup)
//! after the receive buffer is reused.

use crate::error::FrameError;
use crate::{FRAME_HEADER_SIZE, KEY_SIZE, MAGIC, PROTOCOL_VERSION, SIGNATURE_SIZE};

/// Frame types as defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Challenge/response authentication exchange.
    Handshake = 0x01,
    /// Opaque payload addressed to a peer key.
    Data = 0x02,
    /// Peer gossip: discovery and addressee location.
    NodeInfo = 0x03,
    /// Data carrying an end-to-end payload signature. The relay treats it
    /// exactly like [`FrameType::Data`]; only clients verify it.
    SignedData = 0x04,
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Handshake),
            0x02 => Ok(Self::Data),
            0x03 => Ok(Self::NodeInfo),
            0x04 => Ok(Self::SignedData),
            other => Err(FrameError::InvalidFrameType(other)),
        }
    }
}

/// One decoded (or to-be-encoded) protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type.
    pub frame_type: FrameType,
    /// Public key of the sender; all-zero while unknown.
    pub sender_id: [u8; KEY_SIZE],
    /// Ed25519 signature; all-zero when the frame is unsigned.
    pub signature: [u8; SIGNATURE_SIZE],
    /// Frame payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create an unsigned frame with an all-zero sender.
    #[must_use]
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        Self {
            frame_type,
            sender_id: [0u8; KEY_SIZE],
            signature: [0u8; SIGNATURE_SIZE],
            payload,
        }
    }

    /// Set the sender key.
    #[must_use]
    pub fn with_sender(mut self, sender_id: [u8; KEY_SIZE]) -> Self {
        self.sender_id = sender_id;
        self
    }

    /// Set the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: [u8; SIGNATURE_SIZE]) -> Self {
        self.signature = signature;
        self
    }

    /// Whether a signature is present (any non-zero byte).
    #[must_use]
    pub fn has_signature(&self) -> bool {
        self.signature.iter().any(|b| *b != 0)
    }

    /// Whether the sender field carries a key (any non-zero byte).
    #[must_use]
    pub fn has_sender(&self) -> bool {
        self.sender_id.iter().any(|b| *b != 0)
    }

    /// Total encoded length.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Encode into a fresh buffer.
    ///
    /// An unsigned frame gets 64 zero signature bytes; the reserved flags
    /// and msg-id fields are always zero.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.encoded_len()];
        buf[0] = MAGIC;
        buf[1] = PROTOCOL_VERSION;
        buf[2] = self.frame_type as u8;
        // buf[3] flags, buf[8..24] msg_id: reserved, already zero
        buf[4..8].copy_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf[24..56].copy_from_slice(&self.sender_id);
        buf[56..120].copy_from_slice(&self.signature);
        buf[FRAME_HEADER_SIZE..].copy_from_slice(&self.payload);
        buf
    }

    /// Decode one frame from a buffer.
    ///
    /// The payload is copied out of `buf`; trailing bytes beyond the declared
    /// payload length are ignored.
    ///
    /// # Errors
    ///
    /// [`FrameError::TooShort`] if the buffer does not hold the header plus
    /// the declared payload, [`FrameError::BadMagic`] on a wrong first byte,
    /// [`FrameError::InvalidFrameType`] on an unknown type byte.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Err(FrameError::TooShort {
                expected: FRAME_HEADER_SIZE,
                actual: buf.len(),
            });
        }
        if buf[0] != MAGIC {
            return Err(FrameError::BadMagic(buf[0]));
        }
        // buf[1] version: written on encode, not enforced here
        let frame_type = FrameType::try_from(buf[2])?;

        let payload_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        let total = FRAME_HEADER_SIZE + payload_len;
        if buf.len() < total {
            return Err(FrameError::TooShort {
                expected: total,
                actual: buf.len(),
            });
        }

        let mut sender_id = [0u8; KEY_SIZE];
        sender_id.copy_from_slice(&buf[24..56]);
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&buf[56..120]);

        Ok(Self {
            frame_type,
            sender_id,
            signature,
            payload: buf[FRAME_HEADER_SIZE..total].to_vec(),
        })
    }
}
