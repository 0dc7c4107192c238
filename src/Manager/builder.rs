use super::MessageManager;
use crate::Bridge::MessageHandler;
use crate::Core::BridgeError;
use crate::Loop::{NativeLoop, QueueLoopBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a message manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Wall-clock bound of each drain pump during shutdown.
    pub drain_slice: Duration,
    /// Maximum number of drain pumps before giving up.
    pub drain_iterations: u32,
    /// Panic (after stopping) when the drain leaves messages behind.
    pub strict_drain: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            drain_slice: Duration::from_millis(10),
            drain_iterations: 20,
            strict_drain: cfg!(debug_assertions),
        }
    }
}

pub struct ManagerBuilder {
    config: ManagerConfig,
    native: Option<Arc<dyn NativeLoop>>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self {
            config: ManagerConfig::default(),
            native: None, // QueueLoop unless a platform loop is supplied
        }
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native_loop(mut self, native: Arc<dyn NativeLoop>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn with_drain_slice(mut self, slice: Duration) -> Self {
        self.config.drain_slice = slice;
        self
    }

    pub fn with_drain_iterations(mut self, iterations: u32) -> Self {
        self.config.drain_iterations = iterations;
        self
    }

    pub fn with_strict_drain(mut self, strict: bool) -> Self {
        self.config.strict_drain = strict;
        self
    }

    /// Builds the manager without designating a message thread.
    pub fn build_uninitialized<M, H>(self, handler: H) -> MessageManager<M>
    where
        M: Send + 'static,
        H: MessageHandler<M> + 'static,
    {
        let native: Arc<dyn NativeLoop> = match self.native {
            Some(native) => native,
            None => QueueLoopBuilder::new().build_shared(),
        };
        MessageManager::new(native, Arc::new(handler), self.config)
    }

    /// Builds the manager and makes the calling thread its message thread.
    pub fn build<M, H>(self, handler: H) -> Result<MessageManager<M>, BridgeError>
    where
        M: Send + 'static,
        H: MessageHandler<M> + 'static,
    {
        let manager = self.build_uninitialized(handler);
        manager.initialize()?;
        Ok(manager)
    }
}
