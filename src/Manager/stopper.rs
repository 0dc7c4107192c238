use super::state::Shared;
use crate::Loop::NativeLoop;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Stops the dispatch loop; cloneable and `'static`, so it fits into signal
/// handlers and worker threads.
#[derive(Clone)]
pub struct LoopStopper {
    shared: Arc<Shared>,
    native: Arc<dyn NativeLoop>,
}

impl LoopStopper {
    pub(crate) fn new(shared: Arc<Shared>, native: Arc<dyn NativeLoop>) -> Self {
        Self { shared, native }
    }

    pub fn stop(&self) {
        post_quit(&self.shared, self.native.as_ref());
    }

    pub fn is_quit_posted(&self) -> bool {
        self.shared.is_quit_posted()
    }
}

pub(crate) fn post_quit(shared: &Shared, native: &dyn NativeLoop) {
    if !shared.quit_posted.swap(true, Ordering::AcqRel) {
        log::debug!("quit posted to the dispatch loop");
    }
    // Signal every time; a run entered after an earlier stop still unwinds
    native.stop();
}
