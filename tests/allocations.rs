#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use druid_hll::Sketch;

#[test]
fn test_allocations() {
    let _profiler = dhat::Profiler::builder().testing().build();

    let before_new = dhat::HeapStats::get();
    let mut sketch = Sketch::new();
    let after_new = dhat::HeapStats::get();
    dhat::assert_eq!(after_new.total_blocks - before_new.total_blocks, 1);

    // hashing and renormalization work in place
    let mut buf = [0u8; 8];
    for i in 0..200_000u64 {
        buf.copy_from_slice(&i.to_le_bytes());
        sketch.insert(&buf);
    }
    dhat::assert!(sketch.register_offset() > 0);
    let after_insert = dhat::HeapStats::get();
    dhat::assert_eq!(after_insert.total_blocks, after_new.total_blocks);

    // union only allocates transiently for decoding its input
    let encoded = sketch.to_base64();
    let before_union = dhat::HeapStats::get();
    sketch.union(&encoded).unwrap();
    let after_union = dhat::HeapStats::get();
    dhat::assert_eq!(after_union.curr_blocks, before_union.curr_blocks);
}
