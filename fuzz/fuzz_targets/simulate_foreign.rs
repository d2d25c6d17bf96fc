#![no_main]
use libfuzzer_sys::fuzz_target;

use tcpcl_conversation::{simulator::simulate, Preferences};

fuzz_target!(|data: &[u8]| {
    simulate(&Preferences::default(), data);
});
