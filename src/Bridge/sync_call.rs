use super::dispatch_lock::DispatchLock;
use crate::Core::identity::current_thread_token;
use crate::Core::oneshot::{self, Completion};
use crate::Core::BridgeError;
use crate::Loop::NativeLoop;
use crate::Manager::state::Shared;
use crate::Manager::LifecycleState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

// How often a blocked caller re-checks whether the manager has stopped
const HAND_OFF_POLL: Duration = Duration::from_millis(20);

/// Runs functions on the message thread and waits for their results.
///
/// Cloneable handle; safe to move into worker threads.
#[derive(Clone)]
pub struct SyncCaller {
    pub(crate) shared: Arc<Shared>,
    pub(crate) native: Arc<dyn NativeLoop>,
}

impl SyncCaller {
    pub(crate) fn new(shared: Arc<Shared>, native: Arc<dyn NativeLoop>) -> Self {
        Self { shared, native }
    }

    /// Executes `f` on the message thread and returns its result.
    ///
    /// On the message thread `f` runs in place. From any other thread the
    /// caller blocks until `f` has fully run; the result is only read after
    /// the message thread has published it. A caller whose hand-off is
    /// stranded by shutdown returns `Stopped` instead of waiting forever.
    ///
    /// # Errors
    /// * `WouldDeadlock` if the calling thread holds the dispatch lock
    /// * `NotInitialized`, `ShuttingDown`, `Stopped` outside the running state
    /// * `ShuttingDown` if shutdown began while the call was still queued
    pub fn call<F, R>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.shared.is_message_thread() {
            self.shared.check_accepting_calls()?;
            return Ok(f());
        }

        let ticket = self.shared.begin_hand_off();
        self.shared.check_accepting_calls()?;

        if self.shared.holds_dispatch_lock() {
            log::error!("synchronous call issued while holding the dispatch lock");
            return Err(BridgeError::WouldDeadlock);
        }

        let (promise, completion) = oneshot::channel::<R>();
        let shared = Arc::clone(&self.shared);
        self.native.schedule(Box::new(move || {
            let _ticket = ticket;
            if shared.is_flushing() {
                log::trace!("dropping synchronous call during shutdown drain");
                promise.reject(BridgeError::ShuttingDown);
                return;
            }
            promise.fulfil(f());
        }));

        self.wait_for_hand_off(completion)
    }

    /// Blocks until the message thread settles `completion`.
    ///
    /// A hand-off that reached the loop after the drain gave up is never run,
    /// so the wait gives up with `Stopped` once the manager has stopped.
    fn wait_for_hand_off<T>(&self, completion: Completion<T>) -> Result<T, BridgeError> {
        loop {
            let outcome = completion.wait_until(Instant::now() + HAND_OFF_POLL);
            match outcome {
                Some(Ok(value)) => return Ok(value),
                Some(Err(BridgeError::Abandoned)) => return Err(self.shared.abandoned_reason()),
                Some(Err(reason)) => return Err(reason),
                None if self.shared.state() == LifecycleState::Stopped => {
                    log::warn!("blocking hand-off stranded by shutdown");
                    return Err(BridgeError::Stopped);
                }
                None => {}
            }
        }
    }

    /// Takes exclusive hold of the message thread until the guard drops.
    ///
    /// From a worker this parks the message thread inside the native loop;
    /// only one worker can hold the lock at a time. On the message thread the
    /// lock is granted immediately.
    pub fn lock_dispatch(&self) -> Result<DispatchLock<'_>, BridgeError> {
        if self.shared.is_message_thread() {
            self.shared.check_accepting_calls()?;
            return Ok(DispatchLock::message_thread(&self.shared));
        }

        let ticket = self.shared.begin_hand_off();
        self.shared.check_accepting_calls()?;
        if self.shared.holds_dispatch_lock() {
            log::error!("dispatch lock requested twice by the same thread");
            return Err(BridgeError::WouldDeadlock);
        }

        let exclusive = self.shared.dispatch_lock.lock();

        let (acquired, acquired_rx) = oneshot::channel::<()>();
        let (release, release_rx) = oneshot::channel::<()>();
        let shared = Arc::clone(&self.shared);
        self.native.schedule(Box::new(move || {
            let _ticket = ticket;
            if shared.is_flushing() {
                acquired.reject(BridgeError::ShuttingDown);
                return;
            }
            acquired.fulfil(());
            // Park the message thread until the guard goes away
            let _ = release_rx.wait();
        }));

        self.wait_for_hand_off(acquired_rx)?;
        self.shared
            .lock_holder
            .store(current_thread_token(), Ordering::Release);

        Ok(DispatchLock::worker(&self.shared, exclusive, release))
    }

    pub fn is_message_thread(&self) -> bool {
        self.shared.is_message_thread()
    }
}
