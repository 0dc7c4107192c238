// The message manager: owner of the message thread identity, the dispatch
// loop and the shutdown drain. Posting and blocking calls are delegated to
// the two bridges, which share the manager's state.

mod builder;
mod debug;
mod drain;
mod getters;
pub(crate) mod state;
mod stopper;

pub use builder::{ManagerBuilder, ManagerConfig};
pub use drain::DrainReport;
pub use state::LifecycleState;
pub use stopper::LoopStopper;

use crate::Bridge::{DispatchLock, MessageHandler, MessageQueue, SyncCaller};
use crate::Core::{BridgeError, PostError};
use crate::Loop::NativeLoop;
use state::Shared;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Serialises all message handling onto one designated thread.
///
/// The thread that initializes the manager becomes the message thread. Any
/// thread may post messages or make blocking calls; only the message thread
/// may run the dispatch loop or shut the manager down.
pub struct MessageManager<M: Send + 'static> {
    shared: Arc<Shared>,
    native: Arc<dyn NativeLoop>,
    queue: MessageQueue<M>,
    caller: SyncCaller,
    config: ManagerConfig,
}

impl<M: Send + 'static> MessageManager<M> {
    pub(crate) fn new(
        native: Arc<dyn NativeLoop>,
        handler: Arc<dyn MessageHandler<M>>,
        config: ManagerConfig,
    ) -> Self {
        let shared = Arc::new(Shared::new());
        let queue = MessageQueue::new(Arc::clone(&shared), Arc::clone(&native), handler);
        let caller = SyncCaller::new(Arc::clone(&shared), Arc::clone(&native));
        Self {
            shared,
            native,
            queue,
            caller,
            config,
        }
    }

    /// Makes the calling thread the message thread and attaches to the
    /// native loop. Repeated calls are no-ops.
    pub fn initialize(&self) -> Result<(), BridgeError> {
        match self.shared.state() {
            LifecycleState::Created => {}
            LifecycleState::Running => {
                log::debug!("message manager already initialized");
                return Ok(());
            }
            LifecycleState::Draining => return Err(BridgeError::ShuttingDown),
            LifecycleState::Stopped => return Err(BridgeError::Stopped),
        }

        self.shared.identity.claim()?;
        if self
            .shared
            .transition(LifecycleState::Created, LifecycleState::Running)
        {
            self.native.attach();
        }
        Ok(())
    }

    /// True when called from the message thread.
    pub fn is_message_thread(&self) -> bool {
        self.shared.is_message_thread()
    }

    /// Posts `message` for asynchronous delivery to the handler.
    pub fn post(&self, message: M) -> Result<(), PostError<M>> {
        self.queue.post(message)
    }

    /// A cloneable posting handle for worker threads.
    pub fn message_queue(&self) -> MessageQueue<M> {
        self.queue.clone()
    }

    /// Runs `f` on the message thread and returns its result, blocking the
    /// caller when it is not the message thread.
    pub fn call_function_on_message_thread<F, R>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.caller.call(f)
    }

    /// A cloneable synchronous-call handle for worker threads.
    pub fn sync_caller(&self) -> SyncCaller {
        self.caller.clone()
    }

    /// See [`SyncCaller::lock_dispatch`].
    pub fn lock_dispatch(&self) -> Result<DispatchLock<'_>, BridgeError> {
        self.caller.lock_dispatch()
    }

    /// A cloneable handle that can stop the dispatch loop from anywhere.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper::new(Arc::clone(&self.shared), Arc::clone(&self.native))
    }

    /// Blocks the message thread in the native loop until
    /// `stop_dispatch_loop` is called. A no-op once quit has been posted.
    pub fn run_dispatch_loop(&self) -> Result<(), BridgeError> {
        self.check_loop_control()?;
        while !self.shared.is_quit_posted() {
            self.native.run();
        }
        Ok(())
    }

    /// Asks the dispatch loop to return. Safe from any thread; idempotent.
    pub fn stop_dispatch_loop(&self) {
        stopper::post_quit(&self.shared, self.native.as_ref());
    }

    /// Pumps the native loop until `timeout` elapses or quit is posted.
    ///
    /// Returns `Ok(false)` if quit was observed, `Ok(true)` if the time ran
    /// out first.
    pub fn run_dispatch_loop_until(&self, timeout: Duration) -> Result<bool, BridgeError> {
        self.check_loop_control()?;
        if self.shared.is_quit_posted() {
            return Ok(false);
        }
        let deadline = Instant::now().checked_add(timeout);
        let quit = self.pump_until(deadline, || self.shared.is_quit_posted());
        Ok(!quit)
    }

    /// Runs native loop iterations until `done` holds or `deadline` passes.
    /// Each iteration waits inside the native loop, bounded by the deadline;
    /// without a deadline only `done` ends the pump.
    fn pump_until(&self, deadline: Option<Instant>, done: impl Fn() -> bool) -> bool {
        loop {
            if done() {
                return true;
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    deadline - now
                }
                None => Duration::MAX,
            };
            self.native.run_for(remaining);
        }
    }

    fn check_loop_control(&self) -> Result<(), BridgeError> {
        match self.shared.state() {
            LifecycleState::Running => {}
            LifecycleState::Created => return Err(BridgeError::NotInitialized),
            LifecycleState::Draining => return Err(BridgeError::ShuttingDown),
            LifecycleState::Stopped => return Err(BridgeError::Stopped),
        }
        if !self.shared.is_message_thread() {
            log::error!("dispatch loop control called off the message thread");
            return Err(BridgeError::NotMessageThread);
        }
        Ok(())
    }

    /// Tears down without draining. Used when the manager is dropped where a
    /// drain cannot run.
    fn abandon(&self) {
        self.shared.flushing.store(true, Ordering::Release);
        self.shared.quit_posted.store(true, Ordering::Release);
        self.shared.force_stopped();
        self.native.detach();
        self.native.stop();
        self.shared.identity.release();
    }
}

impl<M: Send + 'static> Drop for MessageManager<M> {
    fn drop(&mut self) {
        match self.shared.state() {
            LifecycleState::Stopped => {}
            LifecycleState::Created => self.abandon(),
            _ => {
                if self.shared.is_message_thread() && !std::thread::panicking() {
                    if let Err(e) = self.shutdown_with(false) {
                        log::warn!("shutdown on drop failed: {}", e);
                        self.abandon();
                    }
                } else {
                    log::warn!("message manager dropped without a shutdown drain");
                    self.abandon();
                }
            }
        }
    }
}
