use super::{LifecycleState, MessageManager};
use crate::Core::BridgeError;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Outcome of a shutdown drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Drain pumps run before the queue converged or the budget ran out.
    pub iterations: u32,
    /// Posted messages still undelivered when the drain gave up.
    pub leaked: usize,
    /// Blocking hand-offs whose callers were still waiting when the drain
    /// gave up. Those callers return `Stopped` once the manager has stopped.
    pub stranded_calls: usize,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.leaked == 0 && self.stranded_calls == 0
    }
}

impl<M: Send + 'static> MessageManager<M> {
    /// Shuts the manager down from the message thread.
    ///
    /// Moves to `Draining`, detaches from the native loop, then pumps it in
    /// short slices so already-queued posts are discarded (not delivered)
    /// until the pending count reaches zero or the iteration budget is
    /// spent. Ends in `Stopped` with the message thread identity released.
    ///
    /// A non-zero leak is logged; with `strict_drain` it also panics once the
    /// manager is fully stopped.
    pub fn shutdown(&self) -> Result<DrainReport, BridgeError> {
        self.shutdown_with(self.config.strict_drain)
    }

    pub(crate) fn shutdown_with(&self, strict: bool) -> Result<DrainReport, BridgeError> {
        match self.shared.state() {
            LifecycleState::Created => self.initialize()?,
            LifecycleState::Running => {}
            LifecycleState::Draining => return Err(BridgeError::ShuttingDown),
            LifecycleState::Stopped => return Err(BridgeError::Stopped),
        }
        if !self.shared.is_message_thread() {
            log::error!("shutdown called off the message thread");
            return Err(BridgeError::NotMessageThread);
        }
        if !self
            .shared
            .transition(LifecycleState::Running, LifecycleState::Draining)
        {
            return Err(BridgeError::ShuttingDown);
        }

        self.shared.flushing.store(true, Ordering::Release);
        self.shared.quit_posted.store(true, Ordering::Release);
        self.native.detach();

        let report = self.drain();

        self.shared.force_stopped();
        self.shared.identity.release();

        if report.stranded_calls > 0 {
            log::warn!(
                "{} blocking call(s) still queued after shutdown drain",
                report.stranded_calls
            );
        }
        if report.leaked > 0 {
            log::error!(
                "shutdown drain left {} message(s) undelivered after {} iteration(s)",
                report.leaked,
                report.iterations
            );
            if strict {
                panic!(
                    "message manager leaked {} pending message(s) at shutdown",
                    report.leaked
                );
            }
        } else {
            log::debug!(
                "shutdown drain converged after {} iteration(s)",
                report.iterations
            );
        }
        Ok(report)
    }

    fn drain(&self) -> DrainReport {
        let shared = &self.shared;
        let settled = || shared.pending.is_zero() && shared.hand_offs_in_flight() == 0;

        let mut iterations = 0;
        while !settled() && iterations < self.config.drain_iterations {
            let deadline = Instant::now().checked_add(self.config.drain_slice);
            self.pump_until(deadline, settled);
            iterations += 1;
        }

        DrainReport {
            iterations,
            leaked: shared.pending.get(),
            stranded_calls: shared.hand_offs_in_flight(),
        }
    }
}
