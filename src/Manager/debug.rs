use super::*;
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl<M: Send + 'static> fmt::Debug for MessageManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_message_manager(
            self.state(),
            self.pending_messages(),
            self.is_quit_posted(),
            self.message_thread_token(),
            self.native_loop().as_ref(),
            f,
        )
    }
}

impl<M: Send + 'static> fmt::Debug for MessageQueue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SyncCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCaller")
            .field("on_message_thread", &self.is_message_thread())
            .finish_non_exhaustive()
    }
}
