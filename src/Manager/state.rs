use crate::Core::identity::{current_thread_token, MessageThreadIdentity, NO_THREAD};
use crate::Core::{BridgeError, PendingCount};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Where a manager is in its life.
///
/// `Created → Running → Draining → Stopped`; transitions only move forward.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Built but no message thread designated yet.
    Created = 0,
    /// Message thread designated; posts and calls are accepted.
    Running = 1,
    /// Shutdown drain in progress; queued messages are discarded.
    Draining = 2,
    /// Terminal. Identity released, nothing is accepted.
    Stopped = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// State shared by the manager and both bridges.
pub(crate) struct Shared {
    pub(crate) pending: PendingCount,
    pub(crate) identity: MessageThreadIdentity,
    state: AtomicU8,
    /// Set once by `stop_dispatch_loop`; never cleared.
    pub(crate) quit_posted: AtomicBool,
    /// True while the shutdown drain discards deliveries.
    pub(crate) flushing: AtomicBool,
    /// Token of the worker holding the dispatch lock.
    pub(crate) lock_holder: AtomicU64,
    /// Serialises workers competing for the dispatch lock.
    pub(crate) dispatch_lock: Mutex<()>,
    /// Blocking hand-offs (calls, lock requests) announced but not finished.
    pub(crate) in_flight: AtomicUsize,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            pending: PendingCount::new(),
            identity: MessageThreadIdentity::new(),
            state: AtomicU8::new(LifecycleState::Created as u8),
            quit_posted: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
            lock_holder: AtomicU64::new(NO_THREAD),
            dispatch_lock: Mutex::new(()),
            in_flight: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Moves from `from` to `to`; false if the state was not `from`.
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        debug_assert!(from < to, "lifecycle only moves forward");
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if moved {
            log::debug!("message manager {:?} -> {:?}", from, to);
        }
        moved
    }

    pub(crate) fn force_stopped(&self) {
        let previous = self.state.swap(LifecycleState::Stopped as u8, Ordering::SeqCst);
        if previous != LifecycleState::Stopped as u8 {
            log::debug!(
                "message manager {:?} -> Stopped",
                LifecycleState::from_u8(previous)
            );
        }
    }

    pub(crate) fn check_accepting_posts(&self) -> Result<(), BridgeError> {
        match self.state() {
            LifecycleState::Created | LifecycleState::Running => Ok(()),
            LifecycleState::Draining => Err(BridgeError::ShuttingDown),
            LifecycleState::Stopped => Err(BridgeError::Stopped),
        }
    }

    pub(crate) fn check_accepting_calls(&self) -> Result<(), BridgeError> {
        match self.state() {
            LifecycleState::Running => Ok(()),
            LifecycleState::Created => Err(BridgeError::NotInitialized),
            LifecycleState::Draining => Err(BridgeError::ShuttingDown),
            LifecycleState::Stopped => Err(BridgeError::Stopped),
        }
    }

    #[inline]
    pub(crate) fn is_message_thread(&self) -> bool {
        self.identity.is_current()
    }

    #[inline]
    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn is_quit_posted(&self) -> bool {
        self.quit_posted.load(Ordering::Acquire)
    }

    pub(crate) fn holds_dispatch_lock(&self) -> bool {
        self.lock_holder.load(Ordering::Acquire) == current_thread_token()
    }

    /// Announces a blocking hand-off. The shutdown drain keeps pumping while
    /// any ticket is alive, so announce before checking the state.
    pub(crate) fn begin_hand_off(self: &Arc<Self>) -> HandOffTicket {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        HandOffTicket {
            shared: Arc::clone(self),
        }
    }

    pub(crate) fn hand_offs_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Maps an abandoned hand-off to the shutdown reason when one applies.
    pub(crate) fn abandoned_reason(&self) -> BridgeError {
        match self.state() {
            LifecycleState::Draining => BridgeError::ShuttingDown,
            LifecycleState::Stopped => BridgeError::Stopped,
            _ => BridgeError::Abandoned,
        }
    }
}

/// One announced blocking hand-off; retires itself on drop.
pub(crate) struct HandOffTicket {
    shared: Arc<Shared>,
}

impl Drop for HandOffTicket {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
