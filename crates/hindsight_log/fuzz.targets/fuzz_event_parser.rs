#![no_main]
use libfuzzer_sys::fuzz_target;
use hindsight_log::Event;

fuzz_target!(|data: &[u8]| {
    // Try to parse as a raw event record - should reject, never crash
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = Event::from_json(&value);
    }
});
