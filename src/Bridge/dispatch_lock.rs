use crate::Core::identity::NO_THREAD;
use crate::Core::oneshot::Promise;
use crate::Manager::state::Shared;
use parking_lot::MutexGuard;
use std::sync::atomic::Ordering;

/// Exclusive hold on the message thread, released on drop.
///
/// Not `Send`: the lock belongs to the thread that took it.
pub struct DispatchLock<'a> {
    shared: &'a Shared,
    held: Option<Held<'a>>,
}

struct Held<'a> {
    _exclusive: MutexGuard<'a, ()>,
    release: Promise<()>,
}

impl<'a> DispatchLock<'a> {
    pub(crate) fn message_thread(shared: &'a Shared) -> Self {
        Self { shared, held: None }
    }

    pub(crate) fn worker(
        shared: &'a Shared,
        exclusive: MutexGuard<'a, ()>,
        release: Promise<()>,
    ) -> Self {
        Self {
            shared,
            held: Some(Held {
                _exclusive: exclusive,
                release,
            }),
        }
    }

    /// True when the lock parks the message thread, false when it was taken
    /// on the message thread itself.
    pub fn is_parking_message_thread(&self) -> bool {
        self.held.is_some()
    }
}

impl Drop for DispatchLock<'_> {
    fn drop(&mut self) {
        if let Some(held) = self.held.take() {
            self.shared.lock_holder.store(NO_THREAD, Ordering::Release);
            held.release.fulfil(());
            // `_exclusive` drops here, letting the next worker in
        }
    }
}
