//! Session challenge generation.

use crate::CHALLENGE_SIZE;
use rand_core::{OsRng, RngCore};

/// Draw the 32 cryptographically random bytes a side emits at session open.
///
/// Both sides of a handshake require that the payload they later see signed
/// equals the exact challenge they emitted, which is what makes the exchange
/// replay-resistant.
#[must_use]
pub fn generate_challenge() -> [u8; CHALLENGE_SIZE] {
    let mut challenge = [0u8; CHALLENGE_SIZE];
    OsRng.fill_bytes(&mut challenge);
    challenge
}
