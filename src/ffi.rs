use crate::Bridge::MessageHandler;
use crate::Core::BridgeError;
use crate::Manager::{ManagerBuilder, MessageManager};
use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

// Error codes
pub const MSGTHREAD_SUCCESS: i32 = 0;
pub const MSGTHREAD_TIMED_OUT: i32 = 1;
pub const MSGTHREAD_ERROR_NULL_POINTER: i32 = -1;
pub const MSGTHREAD_ERROR_NOT_INITIALIZED: i32 = -2;
pub const MSGTHREAD_ERROR_ALREADY_CLAIMED: i32 = -3;
pub const MSGTHREAD_ERROR_NOT_MESSAGE_THREAD: i32 = -4;
pub const MSGTHREAD_ERROR_WOULD_DEADLOCK: i32 = -5;
pub const MSGTHREAD_ERROR_SHUTTING_DOWN: i32 = -6;
pub const MSGTHREAD_ERROR_STOPPED: i32 = -7;
pub const MSGTHREAD_ERROR_ABANDONED: i32 = -8;
pub const MSGTHREAD_ERROR_LEAKED: i32 = -9;

/// Delivers (or releases) one posted message: `(context, message)`.
pub type MsgthreadMessageFn = extern "C" fn(context: *mut c_void, message: *mut c_void);

/// Function run on the message thread by `msgthread_call_function`.
pub type MsgthreadCallFn = extern "C" fn(arg: *mut c_void) -> *mut c_void;

fn error_code(e: BridgeError) -> i32 {
    match e {
        BridgeError::NotInitialized => MSGTHREAD_ERROR_NOT_INITIALIZED,
        BridgeError::AlreadyClaimed => MSGTHREAD_ERROR_ALREADY_CLAIMED,
        BridgeError::NotMessageThread => MSGTHREAD_ERROR_NOT_MESSAGE_THREAD,
        BridgeError::WouldDeadlock => MSGTHREAD_ERROR_WOULD_DEADLOCK,
        BridgeError::ShuttingDown => MSGTHREAD_ERROR_SHUTTING_DOWN,
        BridgeError::Stopped => MSGTHREAD_ERROR_STOPPED,
        BridgeError::Abandoned => MSGTHREAD_ERROR_ABANDONED,
    }
}

/// Pointer that the caller promises may cross threads.
#[derive(Clone, Copy)]
struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

impl SendPtr {
    // Method access keeps closures capturing the whole wrapper
    fn get(self) -> *mut c_void {
        self.0
    }
}

/// An opaque posted payload. Released through the callback if it is
/// dropped without being delivered.
pub struct RawMessage {
    payload: SendPtr,
    release: Option<MsgthreadMessageFn>,
    context: SendPtr,
}

impl RawMessage {
    fn take(mut self) -> *mut c_void {
        std::mem::replace(&mut self.payload, SendPtr(ptr::null_mut())).0
    }
}

impl Drop for RawMessage {
    fn drop(&mut self) {
        if self.payload.0.is_null() {
            return;
        }
        if let Some(release) = self.release {
            release(self.context.0, self.payload.0);
        }
    }
}

struct CHandler {
    deliver: MsgthreadMessageFn,
    context: SendPtr,
}

impl MessageHandler<RawMessage> for CHandler {
    fn deliver_message(&self, message: RawMessage) {
        (self.deliver)(self.context.0, message.take());
    }
}

/// Handle to a message manager instance (opaque pointer)
pub struct ManagerHandle {
    inner: MessageManager<RawMessage>,
    release: Option<MsgthreadMessageFn>,
    context: SendPtr,
}

// -----------------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------------

/// Create a message manager; the calling thread becomes the message thread.
///
/// # Arguments
/// * `deliver` - Called on the message thread for each delivered message.
/// * `release` - Optional; called for messages discarded by the shutdown drain.
/// * `context` - Passed through to both callbacks.
///
/// # Returns
/// * Pointer to `ManagerHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn msgthread_manager_new(
    deliver: Option<MsgthreadMessageFn>,
    release: Option<MsgthreadMessageFn>,
    context: *mut c_void,
) -> *mut ManagerHandle {
    let Some(deliver) = deliver else {
        log::error!("msgthread_manager_new: deliver callback is NULL");
        return ptr::null_mut();
    };

    let handler = CHandler {
        deliver,
        context: SendPtr(context),
    };
    match ManagerBuilder::new()
        .with_strict_drain(false)
        .build(handler)
    {
        Ok(manager) => Box::into_raw(Box::new(ManagerHandle {
            inner: manager,
            release,
            context: SendPtr(context),
        })),
        Err(e) => {
            log::error!("msgthread_manager_new: {}", e);
            ptr::null_mut()
        }
    }
}

/// Shut down (drain) and free a manager. Must be called on the message thread.
///
/// # Returns
/// * 0 on a clean drain, `MSGTHREAD_ERROR_LEAKED` if messages were left
///   behind, negative error code otherwise. The handle is freed unless the
///   call came from the wrong thread.
#[no_mangle]
pub extern "C" fn msgthread_manager_free(handle: *mut ManagerHandle) -> i32 {
    if handle.is_null() {
        return MSGTHREAD_ERROR_NULL_POINTER;
    }

    let status = match unsafe { (*handle).inner.shutdown() } {
        Ok(report) if report.leaked > 0 => MSGTHREAD_ERROR_LEAKED,
        Ok(_) => MSGTHREAD_SUCCESS,
        Err(BridgeError::NotMessageThread) => return MSGTHREAD_ERROR_NOT_MESSAGE_THREAD,
        Err(e) => error_code(e),
    };
    unsafe {
        let _ = Box::from_raw(handle); // Dropped automatically
    }
    status
}

// -----------------------------------------------------------------------------
// Messaging
// -----------------------------------------------------------------------------

/// Post an opaque message. Ownership passes to the manager on success.
///
/// # Returns
/// * 0 on success, negative error code otherwise (the caller keeps the message).
#[no_mangle]
pub extern "C" fn msgthread_post(handle: *mut ManagerHandle, message: *mut c_void) -> i32 {
    if handle.is_null() {
        return MSGTHREAD_ERROR_NULL_POINTER;
    }

    let handle = unsafe { &*handle };
    let message = RawMessage {
        payload: SendPtr(message),
        release: handle.release,
        context: handle.context,
    };
    match handle.inner.post(message) {
        Ok(()) => MSGTHREAD_SUCCESS,
        Err(rejected) => {
            let reason = rejected.reason;
            // The caller still owns the payload; do not release it
            let _ = rejected.into_message().take();
            error_code(reason)
        }
    }
}

/// Run `func(arg)` on the message thread and store its return value in `out`.
///
/// # Returns
/// * 0 on success, negative error code otherwise.
#[no_mangle]
pub extern "C" fn msgthread_call_function(
    handle: *mut ManagerHandle,
    func: Option<MsgthreadCallFn>,
    arg: *mut c_void,
    out: *mut *mut c_void,
) -> i32 {
    if handle.is_null() {
        return MSGTHREAD_ERROR_NULL_POINTER;
    }
    let Some(func) = func else {
        return MSGTHREAD_ERROR_NULL_POINTER;
    };

    let handle = unsafe { &*handle };
    let arg = SendPtr(arg);
    match handle
        .inner
        .call_function_on_message_thread(move || SendPtr(func(arg.get())))
    {
        Ok(result) => {
            if !out.is_null() {
                unsafe { *out = result.get() };
            }
            MSGTHREAD_SUCCESS
        }
        Err(e) => error_code(e),
    }
}

/// Number of posted messages not yet delivered.
#[no_mangle]
pub extern "C" fn msgthread_pending_messages(handle: *const ManagerHandle) -> usize {
    if handle.is_null() {
        return 0;
    }
    unsafe { (*handle).inner.pending_messages() }
}

// -----------------------------------------------------------------------------
// Dispatch loop
// -----------------------------------------------------------------------------

/// Run the dispatch loop until stopped. Message thread only.
#[no_mangle]
pub extern "C" fn msgthread_run_dispatch_loop(handle: *mut ManagerHandle) -> i32 {
    if handle.is_null() {
        return MSGTHREAD_ERROR_NULL_POINTER;
    }
    match unsafe { (*handle).inner.run_dispatch_loop() } {
        Ok(()) => MSGTHREAD_SUCCESS,
        Err(e) => error_code(e),
    }
}

/// Pump the dispatch loop for up to `timeout_ms`. Message thread only.
///
/// # Returns
/// * `MSGTHREAD_TIMED_OUT` if the time ran out, 0 if quit was posted,
///   negative error code otherwise.
#[no_mangle]
pub extern "C" fn msgthread_run_dispatch_loop_until(
    handle: *mut ManagerHandle,
    timeout_ms: u32,
) -> i32 {
    if handle.is_null() {
        return MSGTHREAD_ERROR_NULL_POINTER;
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms));
    match unsafe { (*handle).inner.run_dispatch_loop_until(timeout) } {
        Ok(true) => MSGTHREAD_TIMED_OUT,
        Ok(false) => MSGTHREAD_SUCCESS,
        Err(e) => error_code(e),
    }
}

/// Ask the dispatch loop to return. Any thread.
#[no_mangle]
pub extern "C" fn msgthread_stop_dispatch_loop(handle: *mut ManagerHandle) {
    if !handle.is_null() {
        unsafe { (*handle).inner.stop_dispatch_loop() }
    }
}
