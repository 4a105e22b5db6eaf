#![no_main]
use geodb::data_section::DataDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Decode from the start and from an offset chosen by the first byte;
    // pointers and nested containers must never panic or loop
    let decoder = DataDecoder::new(&data[1..]);
    let _ = decoder.decode(0);
    let _ = decoder.decode(data[0] as usize);
});
