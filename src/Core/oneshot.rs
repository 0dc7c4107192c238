// One-shot hand-off between a blocked caller and the message thread.
//
// The completion side only reads the value after the promise side has
// published it under the mutex, so the caller never observes a half-written
// result. Dropping an unfulfilled promise wakes the waiter with `Abandoned`;
// `reject` wakes it with an explicit reason.

use super::error::BridgeError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Instant;

enum Slot<T> {
    Pending,
    Ready(T),
    Failed(BridgeError),
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Write side; consumed by `fulfil`.
pub struct Promise<T> {
    inner: Option<Arc<Inner<T>>>,
}

/// Read side; blocks until the promise is fulfilled or dropped.
pub struct Completion<T> {
    inner: Arc<Inner<T>>,
}

pub fn channel<T>() -> (Promise<T>, Completion<T>) {
    let inner = Arc::new(Inner {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        Promise {
            inner: Some(Arc::clone(&inner)),
        },
        Completion { inner },
    )
}

impl<T> Promise<T> {
    pub fn fulfil(mut self, value: T) {
        if let Some(inner) = self.inner.take() {
            *inner.slot.lock() = Slot::Ready(value);
            inner.ready.notify_all();
        }
    }

    /// Settles without a value; the waiter gets `reason`.
    pub fn reject(mut self, reason: BridgeError) {
        if let Some(inner) = self.inner.take() {
            *inner.slot.lock() = Slot::Failed(reason);
            inner.ready.notify_all();
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let mut slot = inner.slot.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Failed(BridgeError::Abandoned);
            }
            drop(slot);
            inner.ready.notify_all();
        }
    }
}

impl<T> Completion<T> {
    /// Blocks until the value is published.
    pub fn wait(self) -> Result<T, BridgeError> {
        let mut slot = self.inner.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Failed(BridgeError::Abandoned)) {
                Slot::Ready(value) => return Ok(value),
                Slot::Failed(reason) => return Err(reason),
                Slot::Pending => {
                    *slot = Slot::Pending;
                    self.inner.ready.wait(&mut slot);
                }
            }
        }
    }

    /// Like `wait`, giving up at `deadline`. Returns `None` on timeout and
    /// leaves the completion usable.
    pub fn wait_until(&self, deadline: Instant) -> Option<Result<T, BridgeError>> {
        let mut slot = self.inner.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Failed(BridgeError::Abandoned)) {
                Slot::Ready(value) => return Some(Ok(value)),
                Slot::Failed(reason) => return Some(Err(reason)),
                Slot::Pending => {
                    *slot = Slot::Pending;
                    if self.inner.ready.wait_until(&mut slot, deadline).timed_out() {
                        return None;
                    }
                }
            }
        }
    }

    /// True once a value was published or the promise dropped.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.slot.lock(), Slot::Pending)
    }
}
