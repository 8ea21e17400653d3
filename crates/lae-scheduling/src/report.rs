//! Activity snapshots for observability.

use std::fmt;

use serde::Serialize;

use crate::config::FatiguePolicy;
use crate::worker::{FatigueWorker, WorkerState};

/// Snapshot of one worker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkerReport {
    /// Worker id.
    pub id: usize,
    /// Lifecycle state.
    pub state: WorkerState,
    /// Whether a task was running.
    pub busy: bool,
    /// Fixed fatigue coefficient.
    pub fatigue: f64,
    /// Busy time in milliseconds.
    pub time_used_ms: f64,
    /// Idle time in milliseconds.
    pub time_idle_ms: f64,
    /// Tasks that returned normally.
    pub tasks_completed: u64,
    /// Tasks that panicked.
    pub panicked_tasks: u64,
}

impl WorkerReport {
    /// Reads the counters of `worker`.
    #[must_use]
    pub fn from_worker(worker: &FatigueWorker) -> Self {
        Self {
            id: worker.id(),
            state: worker.state(),
            busy: worker.is_busy(),
            fatigue: worker.fatigue(),
            time_used_ms: worker.time_used().as_secs_f64() * 1e3,
            time_idle_ms: worker.time_idle().as_secs_f64() * 1e3,
            tasks_completed: worker.tasks_completed(),
            panicked_tasks: worker.panicked_tasks(),
        }
    }
}

/// Snapshot of the whole pool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchedulerReport {
    /// Tasks accepted but not finished.
    pub in_flight: usize,
    /// Ranking policy in use.
    pub policy: FatiguePolicy,
    /// One entry per worker, in id order.
    pub workers: Vec<WorkerReport>,
}

impl SchedulerReport {
    /// Total number of tasks completed across workers.
    #[must_use]
    pub fn total_completed(&self) -> u64 {
        self.workers.iter().map(|w| w.tasks_completed).sum()
    }
}

impl fmt::Display for SchedulerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Fatigue Scheduler Worker Report ===")?;
        writeln!(f, "in_flight = {}", self.in_flight)?;
        writeln!(f)?;
        for w in &self.workers {
            writeln!(
                f,
                "Worker #{} | busy={} | fatigue={:.3} | time_used={:.3}ms | time_idle={:.3}ms | tasks={}",
                w.id, w.busy, w.fatigue, w.time_used_ms, w.time_idle_ms, w.tasks_completed
            )?;
        }
        Ok(())
    }
}
