#![no_main]
use libfuzzer_sys::fuzz_target;

use tcpcl_conversation::{simulator, Preferences};

fuzz_target!(|data: &[u8]| {
    // a well-formed contact exchange first, then whatever the fuzzer
    // dreamed up as session traffic
    let mut stream = simulator::contact_v4(0x00);
    stream.extend_from_slice(data);
    simulator::simulate(&Preferences::default(), &stream);
});
