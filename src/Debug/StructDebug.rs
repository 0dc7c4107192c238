use crate::Loop::{NativeLoop, QueueLoop, TaskRing};
use crate::Manager::LifecycleState;
use std::fmt;

/// Debug function for MessageManager
///
/// Shows:
/// - Lifecycle state
/// - Pending message count
/// - Quit flag
/// - Message thread token
/// - The plugged-in native loop
pub fn debug_message_manager(
    state: LifecycleState,
    pending: usize,
    quit_posted: bool,
    message_thread: u64,
    native: &dyn NativeLoop,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("MessageManager")
        .field("state", &state)
        .field("pending", &pending)
        .field("quit_posted", &quit_posted)
        .field("message_thread", &message_thread)
        .field("native", &native)
        .finish()
}

/// Debug function for QueueLoop
///
/// Reports queue depth and counters; never touches queued tasks.
pub fn debug_queue_loop(queue_loop: &QueueLoop, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueLoop")
        .field("ring", &queue_loop.ring)
        .field("queued", &queue_loop.queued())
        .field("executed", &queue_loop.executed())
        .field("attached", &queue_loop.is_attached())
        .finish()
}

/// Debug function for TaskRing
pub fn debug_task_ring(ring: &TaskRing, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskRing")
        .field("capacity", &ring.capacity())
        .field("len", &ring.len())
        .finish_non_exhaustive()
}
