#![no_main]

use druid_hll::{Sketch, NUM_BUCKETS};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fn count_non_zero(registers: &[u8]) -> usize {
    registers
        .iter()
        .map(|b| usize::from(b & 0xf0 != 0) + usize::from(b & 0x0f != 0))
        .sum()
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = Sketch::new();
    for chunk in first_half.chunks(4) {
        sketch1.insert(chunk);
        assert_eq!(usize::from(sketch1.num_non_zero_registers()), count_non_zero(sketch1.registers()));
    }

    let mut sketch2 = Sketch::new();
    for chunk in second_half.chunks(4) {
        sketch2.insert(chunk);
    }

    let before = sketch1.register_offset();
    sketch1.union(&sketch2.to_base64()).unwrap();
    assert!(sketch1.register_offset() >= before);
    assert!(usize::from(sketch1.num_non_zero_registers()) <= NUM_BUCKETS);
    assert_eq!(Sketch::from_base64(&sketch1.to_base64()).unwrap(), sketch1);
});
