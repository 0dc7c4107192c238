use super::QueueLoop;
use std::sync::Arc;

pub struct QueueLoopBuilder {
    capacity: usize,
}

impl Default for QueueLoopBuilder {
    fn default() -> Self {
        Self {
            capacity: 1024, // 1024 slots before spilling into the overflow queue
        }
    }
}

impl QueueLoopBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring capacity; rounded up to a power of two.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> QueueLoop {
        QueueLoop::with_capacity(self.capacity)
    }

    pub fn build_shared(self) -> Arc<QueueLoop> {
        Arc::new(self.build())
    }
}
