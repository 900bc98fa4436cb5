//! Fuzz target for frame decoding.
//!
//! The decoder must never panic on arbitrary input, only return Ok or Err.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wisp_proto::Frame;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        // anything that decodes must re-encode to a decodable buffer
        let _ = Frame::decode(&frame.encode());
    }
});
