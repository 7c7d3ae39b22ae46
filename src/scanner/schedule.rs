//! Cancellable deferred tasks.
//!
//! `Scheduler::schedule` returns a `ScheduledTask` handle. Cancelling the handle
//! is best effort: a task that has already started is not interrupted, and with
//! `ThreadScheduler` a cancel racing the deadline may still let the body run.
//! Task bodies must therefore check for themselves whether they are stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`, unless cancelled first.
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask;
}

#[derive(Default)]
struct TaskState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Handle to a pending task.
#[derive(Clone)]
pub struct ScheduledTask {
    state: Arc<TaskState>,
}

impl ScheduledTask {
    fn new() -> Self {
        Self {
            state: Arc::new(TaskState::default()),
        }
    }

    pub fn cancel(&self) {
        let mut cancelled = self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.state.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ----------------------------------------------------------------------------
// ThreadScheduler: wall-clock timers
// ----------------------------------------------------------------------------

/// One short-lived timer thread per scheduled task.
///
/// The thread sleeps on the task's condition variable, so cancellation wakes it
/// immediately instead of waiting out the delay.
#[derive(Default)]
pub struct ThreadScheduler {
    spawned: AtomicU64,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let handle = ScheduledTask::new();
        let state = handle.state.clone();
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + delay;

        let spawn = thread::Builder::new()
            .name(format!("scanner-timer-{}", id))
            .spawn(move || {
                let guard = state
                    .cancelled
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let remaining = deadline.saturating_duration_since(Instant::now());
                let (guard, _) = state
                    .wake
                    .wait_timeout_while(guard, remaining, |cancelled| {
                        !*cancelled && Instant::now() < deadline
                    })
                    .unwrap_or_else(PoisonError::into_inner);
                if *guard {
                    return;
                }
                drop(guard);
                task();
            });

        if let Err(e) = spawn {
            log::error!("failed to spawn timer thread: {}", e);
            handle.cancel();
        }
        handle
    }
}

// ----------------------------------------------------------------------------
// ManualScheduler: virtual clock
// ----------------------------------------------------------------------------

struct PendingTask {
    deadline: Duration,
    seq: u64,
    handle: ScheduledTask,
    task: Task,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTask>,
}

/// Deterministic scheduler driven by `advance`. Tasks never run on their own.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Tasks scheduled and neither cancelled nor run yet.
    pub fn pending(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|p| !p.handle.is_cancelled())
            .count()
    }

    /// Move the clock forward and run every task that came due, in deadline order.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;
        loop {
            let due = {
                let mut clock = self.lock();
                clock.pending.retain(|p| !p.handle.is_cancelled());
                let next = clock
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.deadline <= target)
                    .min_by_key(|(_, p)| (p.deadline, p.seq))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let task = clock.pending.remove(index);
                        clock.now = task.deadline.max(clock.now);
                        Some(task)
                    }
                    None => {
                        clock.now = target;
                        None
                    }
                }
            };
            match due {
                // Run outside the lock; the task may schedule again.
                Some(pending) if !pending.handle.is_cancelled() => (pending.task)(),
                Some(_) => {}
                None => break,
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let handle = ScheduledTask::new();
        let mut clock = self.lock();
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let deadline = clock.now + delay;
        clock.pending.push(PendingTask {
            deadline,
            seq,
            handle: handle.clone(),
            task,
        });
        handle
    }
}
