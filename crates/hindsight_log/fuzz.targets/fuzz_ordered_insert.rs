#![no_main]
use libfuzzer_sys::fuzz_target;
use hindsight_core::EventTime;
use hindsight_log::{Event, EventLog};

fuzz_target!(|data: &[u8]| {
    let mut log = EventLog::new();
    for chunk in data.chunks(2) {
        let mut raw = [0u8; 2];
        raw[..chunk.len()].copy_from_slice(chunk);
        let time = EventTime::from_millis(u64::from(u16::from_le_bytes(raw)));
        log.insert(Event::mutation(time, "edit"));
    }
    // Sort order must hold no matter the arrival order
    assert!(log
        .as_slice()
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
});
