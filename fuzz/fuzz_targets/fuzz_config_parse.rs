#![no_main]

use libfuzzer_sys::fuzz_target;

// Config TOML comes from a user-editable file; parsing must never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<parley::Config>(text) {
            let _ = config.validate();
        }
    }
});
