#![no_main]
use libfuzzer_sys::fuzz_target;

use tcpcl_conversation::{simulator::simulate, Preferences, RecoveryMode};

fuzz_target!(|data: &[u8]| {
    let mut prefs = Preferences::default();
    prefs.recovery = RecoveryMode::V3First;
    simulate(&prefs, data);
    prefs.recovery = RecoveryMode::V4First;
    simulate(&prefs, data);
});
