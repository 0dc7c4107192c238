use super::*;

/// Read-only accessors, mostly for monitoring and tests.
impl<M: Send + 'static> MessageManager<M> {
    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Messages posted but not yet delivered or discarded.
    pub fn pending_messages(&self) -> usize {
        self.shared.pending.get()
    }

    /// Whether `stop_dispatch_loop` (or shutdown) has been requested.
    pub fn is_quit_posted(&self) -> bool {
        self.shared.is_quit_posted()
    }

    /// Whether the shutdown drain is discarding deliveries.
    pub fn is_flushing(&self) -> bool {
        self.shared.is_flushing()
    }

    /// Token of the message thread, see `Core::identity::current_thread_token`.
    pub fn message_thread_token(&self) -> u64 {
        self.shared.identity.token()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn native_loop(&self) -> &Arc<dyn NativeLoop> {
        &self.native
    }
}
