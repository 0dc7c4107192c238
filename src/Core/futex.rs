use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Blocks while `atomic` still holds `expected`, until woken or until
/// `timeout` elapses. Spurious returns are possible; callers re-check.
#[cfg(target_os = "linux")]
pub fn futex_wait(atomic: &AtomicU32, expected: u32, timeout: Option<Duration>) {
    use std::ptr;
    use std::sync::atomic::Ordering;

    // Check condition first to avoid syscall if possible
    if atomic.load(Ordering::Acquire) != expected {
        return;
    }

    let ts = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(ptr::null::<libc::timespec>(), |t| t as *const libc::timespec);

    // FUTEX_WAIT takes a relative timeout
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            ts_ptr,
            ptr::null::<u32>(),
            0u32,
        );
    }
}

/// Wakes every thread parked on `atomic`.
#[cfg(target_os = "linux")]
pub fn futex_wake_all(atomic: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            i32::MAX,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

// Fallback for non-Linux: one process-wide condvar stands in for the futex
// queue. Wakers take the lock before notifying, so a waiter that saw the old
// value under the lock cannot miss the wake.
#[cfg(not(target_os = "linux"))]
static PARK_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

#[cfg(not(target_os = "linux"))]
static PARK_CONDVAR: parking_lot::Condvar = parking_lot::Condvar::new();

#[cfg(not(target_os = "linux"))]
pub fn futex_wait(atomic: &AtomicU32, expected: u32, timeout: Option<Duration>) {
    use std::sync::atomic::Ordering;

    let mut guard = PARK_LOCK.lock();
    if atomic.load(Ordering::Acquire) != expected {
        return;
    }
    match timeout {
        Some(timeout) => {
            PARK_CONDVAR.wait_for(&mut guard, timeout);
        }
        None => PARK_CONDVAR.wait(&mut guard),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wake_all(_atomic: &AtomicU32) {
    let _guard = PARK_LOCK.lock();
    PARK_CONDVAR.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn untimed_wait_returns_on_wake() {
        let word = Arc::new(AtomicU32::new(0));
        let waker = Arc::clone(&word);
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            waker.fetch_add(1, Ordering::Release);
            futex_wake_all(&waker);
        });

        while word.load(Ordering::Acquire) == 0 {
            futex_wait(&word, 0, None);
        }
        t.join().unwrap();
    }

    #[test]
    fn timed_wait_gives_up_at_the_timeout() {
        let word = AtomicU32::new(7);
        let start = Instant::now();
        let deadline = start + Duration::from_millis(20);
        while Instant::now() < deadline {
            futex_wait(&word, 7, Some(deadline.saturating_duration_since(Instant::now())));
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stale_expected_value_returns_immediately() {
        let word = AtomicU32::new(1);
        let start = Instant::now();
        futex_wait(&word, 0, None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
