//! Fuzz target for node-info payload decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wisp_proto::NodeInfo;

fuzz_target!(|data: &[u8]| {
    if let Ok(info) = NodeInfo::decode(data) {
        if let Ok(bytes) = info.encode() {
            let _ = NodeInfo::decode(&bytes);
        }
    }
});
