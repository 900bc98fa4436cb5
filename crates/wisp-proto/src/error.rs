//! Error types for the WISP wire codecs.

use thiserror::Error;

/// Frame-level decode errors.
///
/// Any of these closes the offending session: a peer that cannot frame
/// correctly cannot be resynchronized on a message-oriented transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer shorter than the header, or than the declared payload.
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum length the buffer needed.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// First byte was not the protocol magic.
    #[error("bad frame magic: 0x{0:02X}")]
    BadMagic(u8),

    /// Unknown frame type byte.
    #[error("invalid frame type: 0x{0:02X}")]
    InvalidFrameType(u8),
}

/// Node-info payload decode errors.
///
/// Unlike [`FrameError`], these are dropped with a warning and the session
/// stays open: the frame layer was intact, only one gossip body was bad.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GossipError {
    /// Payload had no subtype byte.
    #[error("empty node-info payload")]
    Empty,

    /// Unknown subtype byte.
    #[error("unknown node-info subtype: 0x{0:02X}")]
    UnknownSubtype(u8),

    /// Body ended before the subtype's fixed or declared fields.
    #[error("node-info body too short for subtype 0x{subtype:02X}")]
    Truncated {
        /// Subtype whose body was short.
        subtype: u8,
    },

    /// An embedded address was not valid UTF-8.
    #[error("advertised address is not valid UTF-8")]
    InvalidAddress,

    /// An address does not fit the one-byte length prefix.
    #[error("address exceeds {0} bytes")]
    AddressTooLong(usize),

    /// Query-response status byte was neither found nor not-found.
    #[error("invalid query-response status: {0}")]
    InvalidStatus(u8),
}
