//! One-shot timers for cache eviction.
//!
//! [`TokioScheduler`] arms real timers on the current tokio runtime, or on
//! a short-lived thread when called outside one.
//! [`ManualScheduler`] keeps a virtual clock that only moves when
//! [`ManualScheduler::advance`] is called, which makes TTL behaviour
//! deterministic in tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A deferred callback.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Scheduler backed by `tokio::time::sleep` on the ambient runtime.
///
/// Outside a runtime each timer gets its own sleeping thread instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                });
            }
            Err(_) => {
                tracing::debug!(?delay, "no tokio runtime, arming timer on a thread");
                let spawned = std::thread::Builder::new()
                    .name("flynet-timer".into())
                    .spawn(move || {
                        std::thread::sleep(delay);
                        task();
                    });
                if let Err(err) = spawned {
                    tracing::warn!(?delay, %err, "failed to spawn timer thread, timer not armed");
                }
            }
        }
    }
}

struct Pending {
    deadline: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: Vec<Pending>,
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    /// Number of timers armed but not yet fired.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .len()
    }

    /// Move the clock forward and run every task that became due, in
    /// deadline order. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let mut due = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.now += by;
            let now = state.now;
            let (due, waiting): (Vec<_>, Vec<_>) =
                state.queue.drain(..).partition(|p| p.deadline <= now);
            state.queue = waiting;
            due
        };
        due.sort_by_key(|p| (p.deadline, p.seq));

        // Tasks run without the lock held so they may arm new timers.
        let fired = due.len();
        for pending in due {
            (pending.task)();
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(Pending { deadline, seq, task });
    }
}
