use super::error::BridgeError;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token value meaning "no thread".
pub const NO_THREAD: u64 = 0;

// Tokens start at 1 so NO_THREAD is never handed out
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

// The thread currently designated as the process' message thread
static CLAIMED_THREAD: AtomicU64 = AtomicU64::new(NO_THREAD);

thread_local! {
    static TOKEN: Cell<u64> = const { Cell::new(NO_THREAD) };
}

/// Returns a process-unique, non-zero token for the calling thread.
///
/// Unlike `std::thread::ThreadId` the token fits in an atomic word, so
/// ownership checks stay lock-free and allocation-free.
#[inline]
pub fn current_thread_token() -> u64 {
    TOKEN.with(|token| {
        let mut value = token.get();
        if value == NO_THREAD {
            value = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
            token.set(value);
        }
        value
    })
}

/// Designation of exactly one thread as "the message thread".
///
/// The designation is claimed process-wide: while one identity holds it no
/// other identity can claim any thread. It is set once and stays put until
/// `release`.
#[derive(Default)]
pub struct MessageThreadIdentity {
    token: AtomicU64,
}

impl MessageThreadIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designates the calling thread. Claiming again from the same thread is
    /// a no-op.
    pub fn claim(&self) -> Result<(), BridgeError> {
        let me = current_thread_token();
        let held = self.token.load(Ordering::Acquire);
        if held == me {
            return Ok(());
        }
        if held != NO_THREAD {
            return Err(BridgeError::AlreadyClaimed);
        }

        CLAIMED_THREAD
            .compare_exchange(NO_THREAD, me, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BridgeError::AlreadyClaimed)?;
        self.token.store(me, Ordering::Release);
        Ok(())
    }

    /// Gives up the designation so another manager may claim a thread.
    pub fn release(&self) {
        let held = self.token.swap(NO_THREAD, Ordering::AcqRel);
        if held != NO_THREAD {
            let _ = CLAIMED_THREAD.compare_exchange(
                held,
                NO_THREAD,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        let held = self.token.load(Ordering::Acquire);
        held != NO_THREAD && held == current_thread_token()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.token.load(Ordering::Acquire) != NO_THREAD
    }

    /// Raw token of the designated thread, `NO_THREAD` when unset.
    pub fn token(&self) -> u64 {
        self.token.load(Ordering::Acquire)
    }
}

impl Drop for MessageThreadIdentity {
    fn drop(&mut self) {
        self.release();
    }
}
