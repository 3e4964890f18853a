#![no_main]

use libfuzzer_sys::fuzz_target;
use parley::store::SessionRecord;

// Stored session records are re-read on restore; a corrupted database row
// must surface as a decode error, never a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<SessionRecord>(text);
    }
});
