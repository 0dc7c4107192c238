// Module naming follows project convention (grouped subsystems are capitalised)
#[allow(non_snake_case)]
pub mod Core {
    pub mod error;
    pub mod futex;
    pub mod identity;
    pub mod oneshot;
    pub mod pending;
    pub use error::{BridgeError, PostError}; // re-export for stable path
    pub use pending::PendingCount;
}
#[allow(non_snake_case)]
pub mod Loop;
#[allow(non_snake_case)]
pub mod Bridge;
#[allow(non_snake_case)]
pub mod Manager;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}
pub mod ffi;

pub use crate::Bridge::{DispatchLock, MessageHandler, MessageQueue, SyncCaller};
pub use crate::Core::{BridgeError, PostError};
pub use crate::Manager::{
    DrainReport, LifecycleState, LoopStopper, ManagerBuilder, MessageManager,
};
pub use crate::Loop::{NativeLoop, QueueLoop, QueueLoopBuilder, Task};
