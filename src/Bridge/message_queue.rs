use crate::Core::PostError;
use crate::Loop::NativeLoop;
use crate::Manager::state::Shared;
use crate::Manager::LifecycleState;
use std::sync::Arc;

/// Receives every successfully delivered post, always on the message thread.
pub trait MessageHandler<M>: Send + Sync {
    fn deliver_message(&self, message: M);
}

impl<M, F> MessageHandler<M> for F
where
    F: Fn(M) + Send + Sync,
{
    fn deliver_message(&self, message: M) {
        self(message)
    }
}

/// Posts messages for asynchronous delivery on the message thread.
///
/// Cheap to clone; every clone feeds the same manager. Posting never blocks,
/// from any thread including the message thread itself. Delivery order is
/// whatever order the native loop runs scheduled work in.
pub struct MessageQueue<M: Send + 'static> {
    pub(crate) shared: Arc<Shared>,
    pub(crate) native: Arc<dyn NativeLoop>,
    pub(crate) handler: Arc<dyn MessageHandler<M>>,
}

impl<M: Send + 'static> Clone for MessageQueue<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            native: Arc::clone(&self.native),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<M: Send + 'static> MessageQueue<M> {
    pub(crate) fn new(
        shared: Arc<Shared>,
        native: Arc<dyn NativeLoop>,
        handler: Arc<dyn MessageHandler<M>>,
    ) -> Self {
        Self {
            shared,
            native,
            handler,
        }
    }

    /// Hands `message` to the native loop for delivery on the message thread.
    ///
    /// Ownership moves to the queue on success. Once shutdown has begun the
    /// message is handed back inside the error.
    pub fn post(&self, message: M) -> Result<(), PostError<M>> {
        // Count first so a concurrent shutdown drain either sees this post or
        // this post sees the drain
        let pending = self.shared.pending.increment();
        if let Err(reason) = self.shared.check_accepting_posts() {
            self.shared.pending.decrement();
            log::warn!("post rejected: {}", reason);
            return Err(PostError { message, reason });
        }
        log::trace!("message posted ({} pending)", pending);

        let envelope = Envelope {
            message: Some(message),
            counted: false,
            shared: Arc::clone(&self.shared),
            handler: Arc::clone(&self.handler),
        };
        self.native.schedule(Box::new(move || envelope.deliver()));
        Ok(())
    }

    /// Messages posted but not yet delivered or discarded.
    pub fn pending(&self) -> usize {
        self.shared.pending.get()
    }
}

/// A posted message in flight inside the native loop.
struct Envelope<M> {
    message: Option<M>,
    /// Whether the pending count has already been dropped for this message.
    counted: bool,
    shared: Arc<Shared>,
    handler: Arc<dyn MessageHandler<M>>,
}

impl<M> Envelope<M> {
    fn deliver(mut self) {
        // A loop pumped again after Stopped may still run stale envelopes;
        // they are only discarded, and the identity is already released
        debug_assert!(
            self.shared.is_message_thread()
                || self.shared.state() == LifecycleState::Stopped,
            "posted message delivered off the message thread"
        );

        self.shared.pending.decrement();
        self.counted = true;

        let Some(message) = self.message.take() else {
            unreachable!("envelope delivered twice");
        };
        if self.shared.is_flushing() {
            log::trace!("discarding message during shutdown drain");
            drop(message);
            return;
        }
        self.handler.deliver_message(message);
    }
}

impl<M> Drop for Envelope<M> {
    fn drop(&mut self) {
        // Dropped by the native loop without running
        if !self.counted {
            self.shared.pending.decrement();
            log::warn!("posted message dropped by the native loop before delivery");
        }
    }
}
