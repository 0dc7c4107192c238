use msgthread::{BridgeError, ManagerBuilder};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
#[serial]
fn lock_on_the_message_thread_is_granted_in_place() {
    init_logging();
    let manager = ManagerBuilder::new().build(|_: ()| {}).unwrap();
    {
        let lock = manager.lock_dispatch().unwrap();
        assert!(!lock.is_parking_message_thread());
        // Calls keep working under a message-thread lock
        assert_eq!(manager.call_function_on_message_thread(|| 3), Ok(3));
    }
    manager.shutdown().unwrap();
}

#[test]
#[serial]
fn worker_lock_parks_the_message_thread() {
    init_logging();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let manager = ManagerBuilder::new()
        .build(move |_: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let caller = manager.sync_caller();
    let queue = manager.message_queue();
    let stopper = manager.stopper();
    let observed = Arc::clone(&delivered);
    let worker = thread::spawn(move || {
        {
            let lock = caller.lock_dispatch().unwrap();
            assert!(lock.is_parking_message_thread());

            // The message thread is parked: posted work waits for the guard
            queue.post(1).unwrap();
            thread::sleep(Duration::from_millis(50));
            assert_eq!(observed.load(Ordering::SeqCst), 0);
        }
        // Guard dropped: the loop resumes and the post goes through
        let seen = caller
            .call(move || observed.load(Ordering::SeqCst))
            .unwrap();
        stopper.stop();
        seen
    });

    manager.run_dispatch_loop().unwrap();
    assert_eq!(worker.join().unwrap(), 1);
    manager.shutdown().unwrap();
}

#[test]
#[serial]
fn call_while_holding_the_lock_would_deadlock() {
    init_logging();
    let manager = ManagerBuilder::new().build(|_: ()| {}).unwrap();

    let caller = manager.sync_caller();
    let stopper = manager.stopper();
    let worker = thread::spawn(move || {
        let outcome = {
            let _lock = caller.lock_dispatch().unwrap();
            let call = caller.call(|| 1);
            let relock = caller.lock_dispatch().map(|_| ());
            (call, relock)
        };
        // Released: calls go through again
        let after = caller.call(|| 2);
        stopper.stop();
        (outcome, after)
    });

    manager.run_dispatch_loop().unwrap();
    let ((call, relock), after) = worker.join().unwrap();
    assert_eq!(call, Err(BridgeError::WouldDeadlock));
    assert_eq!(relock, Err(BridgeError::WouldDeadlock));
    assert_eq!(after, Ok(2));
    manager.shutdown().unwrap();
}

#[test]
#[serial]
fn competing_workers_take_the_lock_one_at_a_time() {
    init_logging();
    let manager = ManagerBuilder::new().build(|_: ()| {}).unwrap();
    let inside = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let caller = manager.sync_caller();
            let inside = Arc::clone(&inside);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                for _ in 0..5 {
                    let _lock = caller.lock_dispatch().unwrap();
                    assert!(!inside.swap(true, Ordering::SeqCst), "lock shared");
                    thread::sleep(Duration::from_millis(1));
                    inside.store(false, Ordering::SeqCst);
                }
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    while finished.load(Ordering::SeqCst) < 4 {
        manager
            .run_dispatch_loop_until(Duration::from_millis(20))
            .unwrap();
    }
    for w in workers {
        w.join().unwrap();
    }
    manager.shutdown().unwrap();
}
