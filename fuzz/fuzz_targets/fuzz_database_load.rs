#![no_main]
use geodb::{DatabaseFormat, GeoDatabase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Garbage images must fail cleanly in both formats
    for format in [DatabaseFormat::Mmdb, DatabaseFormat::Ip2Location] {
        if let Ok(db) = GeoDatabase::from_bytes(data.to_vec(), format) {
            let _ = db.info();
            for ip in ["0.0.0.0", "8.8.8.8", "255.255.255.255", "::1", "2001:db8::1"] {
                let _ = db.lookup(ip);
            }
        }
    }
});
