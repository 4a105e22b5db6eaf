#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(key) = geodb::classify(s) {
            // Keys always fit their family
            assert!(key.value <= key.family.max_value());
        }
    }
});
