use super::ring::TaskRing;
use super::{NativeLoop, Task};
use crate::Core::futex::{futex_wait, futex_wake_all};
use crate::Core::identity::{current_thread_token, NO_THREAD};
use crate::Core::oneshot;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Portable run loop used when no platform loop is plugged in.
///
/// Tasks land in a lock-free ring; once the ring is full they spill into a
/// mutex-guarded overflow queue, so `schedule` never blocks or fails. The
/// loop thread parks on a futex word that every schedule and every `stop`
/// bumps.
pub struct QueueLoop {
    pub(crate) ring: TaskRing,
    pub(crate) overflow: Mutex<VecDeque<Task>>,
    pub(crate) overflowed: AtomicUsize,
    /// Signal word for futex-based blocking/waking.
    pub(crate) signal: AtomicU32,
    pub(crate) stop_requested: AtomicBool,
    pub(crate) attached: AtomicBool,
    /// Token of the thread inside `run`/`run_for`, NO_THREAD when idle.
    pub(crate) runner: AtomicU64,
    pub(crate) executed: AtomicU64,
}

impl QueueLoop {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: TaskRing::new(capacity),
            overflow: Mutex::new(VecDeque::new()),
            overflowed: AtomicUsize::new(0),
            signal: AtomicU32::new(0),
            stop_requested: AtomicBool::new(false),
            attached: AtomicBool::new(false),
            runner: AtomicU64::new(NO_THREAD),
            executed: AtomicU64::new(0),
        }
    }

    fn push(&self, task: Task) {
        if let Err(task) = self.ring.enqueue(task) {
            let mut overflow = self.overflow.lock();
            overflow.push_back(task);
            self.overflowed.fetch_add(1, Ordering::Release);
        }
        self.wake();
    }

    fn pop(&self) -> Option<Task> {
        if let Some(task) = self.ring.dequeue() {
            return Some(task);
        }
        if self.overflowed.load(Ordering::Acquire) == 0 {
            return None;
        }
        let mut overflow = self.overflow.lock();
        let task = overflow.pop_front();
        if task.is_some() {
            self.overflowed.fetch_sub(1, Ordering::AcqRel);
        }
        task
    }

    fn wake(&self) {
        self.signal.fetch_add(1, Ordering::Release);
        futex_wake_all(&self.signal);
    }

    fn run_one(&self) -> bool {
        match self.pop() {
            Some(task) => {
                task();
                self.executed.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Marks the calling thread as the loop thread for the guard's lifetime.
    fn enter(&self) -> RunnerGuard<'_> {
        let previous = self.runner.swap(current_thread_token(), Ordering::AcqRel);
        RunnerGuard {
            runner: &self.runner,
            previous,
        }
    }

    fn is_loop_thread(&self) -> bool {
        self.runner.load(Ordering::Acquire) == current_thread_token()
    }

    /// Number of tasks waiting to run.
    pub fn queued(&self) -> usize {
        self.ring.len() + self.overflowed.load(Ordering::Acquire)
    }

    /// Total number of tasks this loop has run.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

struct RunnerGuard<'a> {
    runner: &'a AtomicU64,
    previous: u64,
}

impl Drop for RunnerGuard<'_> {
    fn drop(&mut self) {
        self.runner.store(self.previous, Ordering::Release);
    }
}

impl NativeLoop for QueueLoop {
    fn schedule(&self, task: Task) {
        self.push(task);
    }

    fn schedule_blocking(&self, task: Task) {
        // Blocking on ourselves would never return; run in place instead
        if self.is_loop_thread() {
            task();
            self.executed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let (done, completion) = oneshot::channel::<()>();
        self.push(Box::new(move || {
            task();
            done.fulfil(());
        }));
        // Settles on completion, on unwind, or when the task is dropped unrun
        let _ = completion.wait();
    }

    fn run(&self) {
        let _runner = self.enter();
        loop {
            if self.stop_requested.swap(false, Ordering::AcqRel) {
                break;
            }
            let seen = self.signal.load(Ordering::Acquire);
            if !self.run_one() {
                if self.stop_requested.load(Ordering::Acquire) {
                    continue;
                }
                futex_wait(&self.signal, seen, None);
            }
        }
    }

    fn run_for(&self, timeout: Duration) -> bool {
        let _runner = self.enter();
        // None: the timeout is beyond what Instant can represent, wait unbounded
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let seen = self.signal.load(Ordering::Acquire);
            if self.run_one() {
                return true;
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            futex_wait(&self.signal, seen, remaining);
            if self.signal.load(Ordering::Acquire) != seen {
                // Woken by a schedule or a stop: one more look, then hand back
                return self.run_one();
            }
        }
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake();
    }

    fn attach(&self) {
        if !self.attached.swap(true, Ordering::AcqRel) {
            log::debug!("queue loop attached");
        }
    }

    fn detach(&self) {
        if self.attached.swap(false, Ordering::AcqRel) {
            log::debug!("queue loop detached with {} task(s) queued", self.queued());
        }
    }
}

impl Default for QueueLoop {
    fn default() -> Self {
        super::QueueLoopBuilder::new().build()
    }
}
