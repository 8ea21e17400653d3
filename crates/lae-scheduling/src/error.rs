//! Errors raised by workers and the scheduler.

use thiserror::Error;

/// Errors raised by a single [`FatigueWorker`](crate::FatigueWorker).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker's mailbox already holds a task that has not started.
    #[error("worker {0} already holds a pending task")]
    SlotOccupied(usize),

    /// Shutdown was requested; no new tasks are accepted.
    #[error("worker {0} is shutting down")]
    ShuttingDown(usize),

    /// [`FatigueWorker::start`](crate::FatigueWorker::start) was called twice.
    #[error("worker {0} was already started")]
    AlreadyStarted(usize),

    /// The operating system refused to spawn the worker thread.
    #[error("failed to spawn thread for worker {id}")]
    Spawn {
        /// Worker id.
        id: usize,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the [`FatigueScheduler`](crate::FatigueScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The pool must have at least one worker.
    #[error("number of workers must be positive, got {0}")]
    InvalidWorkerCount(usize),

    /// The fatigue range was empty, non-finite or not positive.
    #[error("fatigue range {min}..{max} must be finite, positive and non-empty")]
    InvalidFatigueRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// An explicit fatigue coefficient was not finite and positive.
    #[error("fatigue coefficient {0} must be finite and positive")]
    InvalidFatigue(f64),

    /// The scheduler no longer accepts tasks.
    #[error("scheduler has been shut down")]
    ShutDown,

    /// A worker could not be created.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
