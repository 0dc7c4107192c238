// Bounded lock-free MPMC ring of tasks feeding the reference loop

use super::Task;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};

/// A single slot in the ring.
struct Slot {
    /// The sequence number of the slot. This is the core of the synchronization.
    /// - A producer claims a `tail` sequence and waits for the `sequence` in
    ///   the target slot to equal `tail`.
    /// - After writing, it sets the `sequence` to `tail + 1`, signaling completion.
    /// - A consumer waits for the `sequence` in its `head` slot to equal
    ///   `head + 1`.
    sequence: AtomicU64,
    task: UnsafeCell<MaybeUninit<Task>>,
}

/// Lock-free, multi-producer, multi-consumer ring of boxed tasks.
///
/// ### Concurrency Design:
/// - **Producers (Enqueue)**: claim a slot by advancing `tail` with a CAS once
///   the slot's `sequence` says it is free.
/// - **Consumers (Dequeue)**: claim a task by advancing `head` once the slot's
///   `sequence` says the producer finished writing.
pub struct TaskRing {
    slots: Box<[CachePadded<Slot>]>,
    capacity: usize,
    /// `capacity - 1`; capacity is always a power of two.
    mask: usize,
    tail: CachePadded<AtomicU64>,
    head: CachePadded<AtomicU64>,
}

unsafe impl Send for TaskRing {}
unsafe impl Sync for TaskRing {}

impl TaskRing {
    /// Creates a ring with room for `capacity` tasks, rounded up to a power
    /// of two (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots = (0..capacity)
            .map(|k| {
                CachePadded::new(Slot {
                    sequence: AtomicU64::new(k as u64),
                    task: UnsafeCell::new(MaybeUninit::uninit()),
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            capacity,
            mask: capacity - 1,
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Approximate number of queued tasks.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Acquire);
        let head = self.head.load(Acquire);
        tail.saturating_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue reserves a slot and publishes the task.
    /// Returns the slot index on success, or hands the task back if the ring is full.
    pub fn enqueue(&self, task: Task) -> Result<usize, Task> {
        loop {
            let tail = self.tail.load(Relaxed);
            let idx = (tail as usize) & self.mask;
            let slot = &self.slots[idx];
            let seq = slot.sequence.load(Acquire);
            let dif = seq as i64 - tail as i64;

            if dif == 0 {
                if self
                    .tail
                    .compare_exchange_weak(tail, tail + 1, AcqRel, Relaxed)
                    .is_ok()
                {
                    // We own this slot now
                    unsafe {
                        (*slot.task.get()).write(task);
                    }
                    // Publish
                    slot.sequence.store(tail + 1, Release);
                    return Ok(idx);
                }
            } else if dif < 0 {
                // full
                return Err(task);
            } else {
                // someone else is producing; backoff and retry
                std::hint::spin_loop();
            }
        }
    }

    /// Dequeue acquires a ready slot and takes its task.
    /// Returns None if the ring appears empty.
    pub fn dequeue(&self) -> Option<Task> {
        loop {
            let head = self.head.load(Relaxed);
            let idx = (head as usize) & self.mask;
            let slot = &self.slots[idx];
            let seq = slot.sequence.load(Acquire);
            let dif = seq as i64 - (head as i64 + 1);

            if dif == 0 {
                if self
                    .head
                    .compare_exchange_weak(head, head + 1, AcqRel, Relaxed)
                    .is_ok()
                {
                    let task = unsafe { (*slot.task.get()).assume_init_read() };
                    // free slot for future producers
                    slot.sequence.store(head + self.capacity as u64, Release);
                    return Some(task);
                }
            } else if dif < 0 {
                // empty
                return None;
            } else {
                // producer not finished; retry
                std::hint::spin_loop();
            }
        }
    }
}

impl Drop for TaskRing {
    fn drop(&mut self) {
        // Tasks still queued are dropped unrun
        while let Some(task) = self.dequeue() {
            drop(task);
        }
    }
}
