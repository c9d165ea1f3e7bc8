#![no_main]

use aotdbg::{information::GeneratedLocation, DebugInformation};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(info) = DebugInformation::from_bytes(data) {
        let _ = info.source_location(GeneratedLocation::new(0, 0));
        let reencoded = DebugInformation::from_bytes(&info.to_bytes());
        assert!(reencoded.is_ok_and(|copy| copy == info));
    }
});
