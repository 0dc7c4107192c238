mod dispatch_lock;
mod message_queue;
mod sync_call;

pub use dispatch_lock::DispatchLock;
pub use message_queue::{MessageHandler, MessageQueue};
pub use sync_call::SyncCaller;
