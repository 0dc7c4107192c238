use msgthread::ffi::*;
use serial_test::serial;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Counters {
    delivered: AtomicUsize,
    released: AtomicUsize,
    sum: AtomicU64,
}

extern "C" fn on_deliver(context: *mut c_void, message: *mut c_void) {
    let counters = unsafe { &*(context as *const Counters) };
    let value = unsafe { Box::from_raw(message as *mut u64) };
    counters.sum.fetch_add(*value, Ordering::SeqCst);
    counters.delivered.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn on_release(context: *mut c_void, message: *mut c_void) {
    let counters = unsafe { &*(context as *const Counters) };
    drop(unsafe { Box::from_raw(message as *mut u64) });
    counters.released.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn double(arg: *mut c_void) -> *mut c_void {
    (arg as usize * 2) as *mut c_void
}

fn boxed(value: u64) -> *mut c_void {
    Box::into_raw(Box::new(value)) as *mut c_void
}

fn new_manager(counters: &Counters) -> *mut ManagerHandle {
    let handle = msgthread_manager_new(
        Some(on_deliver),
        Some(on_release),
        counters as *const Counters as *mut c_void,
    );
    assert!(!handle.is_null());
    handle
}

#[test]
#[serial]
fn posted_payloads_reach_the_deliver_callback() {
    let counters = Counters::default();
    let handle = new_manager(&counters);

    for v in 1..=3 {
        assert_eq!(msgthread_post(handle, boxed(v)), MSGTHREAD_SUCCESS);
    }
    assert_eq!(msgthread_pending_messages(handle), 3);

    let deadline = Instant::now() + Duration::from_secs(10);
    while counters.delivered.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        assert_eq!(
            msgthread_run_dispatch_loop_until(handle, 20),
            MSGTHREAD_TIMED_OUT
        );
    }
    assert_eq!(counters.sum.load(Ordering::SeqCst), 6);
    assert_eq!(msgthread_pending_messages(handle), 0);

    assert_eq!(msgthread_manager_free(handle), MSGTHREAD_SUCCESS);
    assert_eq!(counters.released.load(Ordering::SeqCst), 0);
}

#[test]
#[serial]
fn call_function_round_trips_through_the_message_thread() {
    let counters = Counters::default();
    let handle = new_manager(&counters);

    // In place on the message thread
    let mut out: *mut c_void = ptr::null_mut();
    assert_eq!(
        msgthread_call_function(handle, Some(double), 21 as *mut c_void, &mut out),
        MSGTHREAD_SUCCESS
    );
    assert_eq!(out as usize, 42);

    // Blocking from a worker while the message thread runs its loop
    let raw = handle as usize;
    let worker = thread::spawn(move || {
        let handle = raw as *mut ManagerHandle;
        let mut out: *mut c_void = ptr::null_mut();
        let status = msgthread_call_function(handle, Some(double), 50 as *mut c_void, &mut out);
        msgthread_stop_dispatch_loop(handle);
        (status, out as usize)
    });
    assert_eq!(msgthread_run_dispatch_loop(handle), MSGTHREAD_SUCCESS);
    assert_eq!(worker.join().unwrap(), (MSGTHREAD_SUCCESS, 100));

    // Quit is sticky
    assert_eq!(msgthread_run_dispatch_loop_until(handle, 1000), MSGTHREAD_SUCCESS);
    assert_eq!(msgthread_manager_free(handle), MSGTHREAD_SUCCESS);
}

#[test]
#[serial]
fn drained_payloads_go_to_the_release_callback() {
    let counters = Counters::default();
    let handle = new_manager(&counters);

    assert_eq!(msgthread_post(handle, boxed(7)), MSGTHREAD_SUCCESS);
    assert_eq!(msgthread_post(handle, boxed(8)), MSGTHREAD_SUCCESS);
    assert_eq!(msgthread_manager_free(handle), MSGTHREAD_SUCCESS);

    assert_eq!(counters.delivered.load(Ordering::SeqCst), 0);
    assert_eq!(counters.released.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn free_off_the_message_thread_keeps_the_handle() {
    let counters = Counters::default();
    let handle = new_manager(&counters);

    let raw = handle as usize;
    let status = thread::spawn(move || msgthread_manager_free(raw as *mut ManagerHandle))
        .join()
        .unwrap();
    assert_eq!(status, MSGTHREAD_ERROR_NOT_MESSAGE_THREAD);

    // Still usable
    assert_eq!(msgthread_post(handle, boxed(1)), MSGTHREAD_SUCCESS);
    assert_eq!(msgthread_manager_free(handle), MSGTHREAD_SUCCESS);
    assert_eq!(counters.released.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn null_arguments_are_reported() {
    let null = ptr::null_mut::<ManagerHandle>();
    assert_eq!(msgthread_post(null, ptr::null_mut()), MSGTHREAD_ERROR_NULL_POINTER);
    assert_eq!(msgthread_manager_free(null), MSGTHREAD_ERROR_NULL_POINTER);
    assert_eq!(msgthread_run_dispatch_loop(null), MSGTHREAD_ERROR_NULL_POINTER);
    assert_eq!(
        msgthread_run_dispatch_loop_until(null, 1),
        MSGTHREAD_ERROR_NULL_POINTER
    );
    assert_eq!(msgthread_pending_messages(null), 0);
    msgthread_stop_dispatch_loop(null);

    assert!(msgthread_manager_new(None, None, ptr::null_mut()).is_null());

    let counters = Counters::default();
    let handle = new_manager(&counters);
    assert_eq!(
        msgthread_call_function(handle, None, ptr::null_mut(), ptr::null_mut()),
        MSGTHREAD_ERROR_NULL_POINTER
    );
    assert_eq!(msgthread_manager_free(handle), MSGTHREAD_SUCCESS);
}
