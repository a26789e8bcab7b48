#![no_main]

use druid_hll::Sketch;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<Sketch>(text);
        let _ = Sketch::new().union(text);
    }
    if let Ok(mut sketch) = Sketch::from_bytes(data) {
        assert_eq!(sketch.to_bytes(), data);
        sketch.insert(&1u64.to_le_bytes());
        let copy = sketch.clone();
        sketch.merge(&copy);
    }
});
