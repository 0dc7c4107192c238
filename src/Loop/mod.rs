// Boundary between the message thread core and the host platform's run loop.

mod builder;
mod queue_loop;
pub mod ring;

pub use builder::QueueLoopBuilder;
pub use queue_loop::QueueLoop;
pub use ring::TaskRing;

use std::fmt::Debug;
use std::time::Duration;

/// A unit of work handed to the native loop.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Capability surface the message thread core needs from a host run loop.
///
/// Tasks must execute on the thread that drives `run`/`run_for`, which the
/// message manager only ever does from the message thread.
pub trait NativeLoop: Send + Sync + Debug {
    /// Queue `task` for the loop thread and return immediately.
    fn schedule(&self, task: Task);

    /// Queue `task` and block the caller until it has run or been dropped.
    fn schedule_blocking(&self, task: Task);

    /// Run the loop until `stop` is called.
    fn run(&self);

    /// Run at most one loop iteration, waiting up to `timeout` for work.
    /// Returns true if a task ran.
    fn run_for(&self, timeout: Duration) -> bool;

    /// Make a blocking `run` return. Also wakes a pending `run_for` wait.
    fn stop(&self);

    /// Register lifecycle observers. Called once when a manager initializes.
    fn attach(&self) {}

    /// Deregister observers and cancel any repeating sources.
    fn detach(&self) {}
}

// Debug proxy implementations that call the standalone debug functions
impl Debug for QueueLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_queue_loop(self, f)
    }
}

impl Debug for TaskRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_task_ring(self, f)
    }
}
