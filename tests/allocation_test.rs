// Heap accounting for the hot paths.
//
// Run:
//   cargo test --test allocation_test -- --nocapture
//
// dhat allows one profiler per process at a time, so everything lives in a
// single test.

use msgthread::ManagerBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[test]
#[serial_test::serial]
fn message_thread_fast_path_and_posts_stay_lean() {
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let manager = ManagerBuilder::new()
        .build(move |_: u64| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    // Warm up thread locals before measuring
    assert_eq!(manager.call_function_on_message_thread(|| 1u64), Ok(1));

    let _profiler = dhat::Profiler::builder().testing().build();

    // In-place synchronous calls never touch the heap
    let before = dhat::HeapStats::get();
    let mut sum = 0u64;
    for i in 0..1000u64 {
        sum += manager.call_function_on_message_thread(move || i).unwrap();
    }
    let after = dhat::HeapStats::get();
    assert_eq!(sum, 999 * 1000 / 2);
    dhat::assert_eq!(after.total_blocks, before.total_blocks);

    // A post costs at most one boxed task
    let before = dhat::HeapStats::get();
    for i in 0..100u64 {
        manager.post(i).unwrap();
    }
    while delivered.load(Ordering::Relaxed) < 100 {
        manager
            .run_dispatch_loop_until(Duration::from_millis(5))
            .unwrap();
    }
    let after = dhat::HeapStats::get();
    let per_post = (after.total_blocks - before.total_blocks) as f64 / 100.0;
    println!("heap blocks per post: {:.2}", per_post);
    dhat::assert!(after.total_blocks - before.total_blocks <= 100);
    dhat::assert_eq!(after.curr_blocks, before.curr_blocks);

    drop(_profiler);
    manager.shutdown().unwrap();
}
