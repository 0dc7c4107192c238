use msgthread::{NativeLoop, QueueLoopBuilder};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn run_for_times_out_when_idle() {
    let native = QueueLoopBuilder::new().build();
    let start = Instant::now();
    assert!(!native.run_for(Duration::from_millis(30)));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(25), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);
}

#[test]
fn run_for_runs_one_task_per_iteration() {
    let native = QueueLoopBuilder::new().build();
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let ran = Arc::clone(&ran);
        native.schedule(Box::new(move || {
            ran.fetch_add(1, Ordering::Relaxed);
        }));
    }
    assert_eq!(native.queued(), 3);

    assert!(native.run_for(Duration::from_millis(10)));
    assert_eq!(ran.load(Ordering::Relaxed), 1);
    assert!(native.run_for(Duration::from_millis(10)));
    assert!(native.run_for(Duration::from_millis(10)));
    assert_eq!(ran.load(Ordering::Relaxed), 3);
    assert_eq!(native.executed(), 3);
    assert_eq!(native.queued(), 0);
}

#[test]
fn schedule_from_another_thread_wakes_run_for() {
    let native = QueueLoopBuilder::new().build_shared();
    let poster = Arc::clone(&native);
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        poster.schedule(Box::new(|| {}));
    });

    let start = Instant::now();
    assert!(native.run_for(Duration::from_secs(5)));
    assert!(start.elapsed() < Duration::from_secs(4));
    t.join().unwrap();
}

#[test]
fn stop_unwinds_run_from_another_thread() {
    let native = QueueLoopBuilder::new().build_shared();
    let stopper = Arc::clone(&native);
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stopper.stop();
    });

    let start = Instant::now();
    native.run();
    assert!(start.elapsed() < Duration::from_secs(5));
    t.join().unwrap();
}

#[test]
fn stop_before_run_is_not_lost() {
    let native = QueueLoopBuilder::new().build();
    native.stop();
    // Returns immediately instead of blocking forever
    native.run();
}

#[test]
fn schedule_blocking_waits_for_the_loop_thread() {
    let native = QueueLoopBuilder::new().build_shared();
    let done = Arc::new(AtomicBool::new(false));

    let caller_loop = Arc::clone(&native);
    let caller_done = Arc::clone(&done);
    let caller = thread::spawn(move || {
        let flag = Arc::clone(&caller_done);
        caller_loop.schedule_blocking(Box::new(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::SeqCst);
        }));
        // Must only return after the task has fully run
        assert!(caller_done.load(Ordering::SeqCst));
        caller_loop.stop();
    });

    native.run();
    caller.join().unwrap();
    assert!(done.load(Ordering::SeqCst));
}

#[test]
fn schedule_blocking_on_the_loop_thread_runs_inline() {
    let native = QueueLoopBuilder::new().build_shared();
    let inner = Arc::clone(&native);
    let nested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&nested);

    native.schedule(Box::new(move || {
        let flag = Arc::clone(&flag);
        inner.schedule_blocking(Box::new(move || flag.store(true, Ordering::SeqCst)));
    }));
    assert!(native.run_for(Duration::from_millis(100)));
    assert!(nested.load(Ordering::SeqCst));
}

#[test]
fn overflow_beyond_ring_capacity_still_runs_everything() {
    let native = QueueLoopBuilder::new().with_capacity(4).build();
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..100 {
        let ran = Arc::clone(&ran);
        native.schedule(Box::new(move || {
            ran.fetch_add(1, Ordering::Relaxed);
        }));
    }
    assert_eq!(native.queued(), 100);

    while native.run_for(Duration::ZERO) {}
    assert_eq!(ran.load(Ordering::Relaxed), 100);
}

#[test]
fn attach_and_detach_toggle_observers() {
    let native = QueueLoopBuilder::new().build();
    assert!(!native.is_attached());
    native.attach();
    assert!(native.is_attached());
    native.detach();
    assert!(!native.is_attached());
    println!("{:?}", native);
}

#[test]
fn run_for_accepts_an_unbounded_timeout() {
    let native = QueueLoopBuilder::new().build_shared();

    // Work already queued: returns at once
    native.schedule(Box::new(|| {}));
    assert!(native.run_for(Duration::MAX));

    // Idle: a later schedule ends the wait
    let poster = Arc::clone(&native);
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        poster.schedule(Box::new(|| {}));
    });
    assert!(native.run_for(Duration::MAX));
    t.join().unwrap();

    // Idle: a stop ends the wait without running anything
    let stopper = Arc::clone(&native);
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        stopper.stop();
    });
    assert!(!native.run_for(Duration::MAX));
    t.join().unwrap();
}
