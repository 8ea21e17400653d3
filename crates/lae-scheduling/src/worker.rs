//! Long-lived worker threads with a single-slot mailbox.
//!
//! A worker holds at most one pending task. Because of that, "mailbox empty"
//! is the same as "ready for work" from the scheduler's point of view.

use std::any::Any;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::WorkerError;

/// A unit of work run on a worker thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed; no thread yet.
    Created,
    /// The thread is running and accepts tasks.
    Running,
    /// Shutdown was requested; the thread exits once its mailbox is empty.
    ShuttingDown,
    /// The thread has exited.
    Terminated,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::ShuttingDown,
            _ => WorkerState::Terminated,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Created => 0,
            WorkerState::Running => 1,
            WorkerState::ShuttingDown => 2,
            WorkerState::Terminated => 3,
        }
    }
}

/// A task the worker refused, handed back to the caller.
#[derive(Error)]
#[error("{reason}")]
pub struct Rejected {
    reason: WorkerError,
    task: Task,
}

impl Rejected {
    /// Returns why the task was refused.
    #[must_use]
    pub fn reason(&self) -> &WorkerError {
        &self.reason
    }

    /// Returns the refused task.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.task
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

struct Job {
    task: Task,
    then: Option<Task>,
}

struct Mailbox {
    job: Option<Job>,
    shutdown: bool,
}

struct Shared {
    id: usize,
    fatigue: f64,
    mailbox: Mutex<Mailbox>,
    wake: Condvar,
    state: AtomicU8,
    busy: AtomicBool,
    time_used: AtomicU64,
    time_idle: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// One worker thread with a fatigue coefficient and activity counters.
///
/// Workers order by fatigue coefficient, ties broken by id.
pub struct FatigueWorker {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FatigueWorker {
    /// Creates a worker without starting its thread.
    #[must_use]
    pub fn new(id: usize, fatigue: f64) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                fatigue,
                mailbox: Mutex::new(Mailbox {
                    job: None,
                    shutdown: false,
                }),
                wake: Condvar::new(),
                state: AtomicU8::new(WorkerState::Created.as_u8()),
                busy: AtomicBool::new(false),
                time_used: AtomicU64::new(0),
                time_idle: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::AlreadyStarted`] on a second call, or
    /// [`WorkerError::Spawn`] if the thread cannot be created.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut handle = self.handle.lock();
        if handle.is_some() || self.state() != WorkerState::Created {
            return Err(WorkerError::AlreadyStarted(self.id()));
        }

        self.shared.set_state(WorkerState::Running);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("lae-worker-{}", self.id()))
            .spawn(move || run_loop(&shared));

        match spawned {
            Ok(join) => {
                *handle = Some(join);
                Ok(())
            }
            Err(source) => {
                self.shared.set_state(WorkerState::Created);
                Err(WorkerError::Spawn {
                    id: self.id(),
                    source,
                })
            }
        }
    }

    /// Places `task` in the mailbox.
    ///
    /// A worker that was created but not started keeps the task until
    /// [`FatigueWorker::start`] is called.
    ///
    /// # Errors
    ///
    /// Hands the task back with [`WorkerError::SlotOccupied`] if a task is
    /// still pending, or [`WorkerError::ShuttingDown`] after shutdown.
    pub fn submit_task(&self, task: Task) -> Result<(), Rejected> {
        self.enqueue(Job { task, then: None })
    }

    /// Places `task` in the mailbox and runs `then` on the worker thread
    /// once the busy flag and time counters include `task`.
    ///
    /// `then` runs even if `task` panics. A refused `then` is dropped
    /// without running.
    ///
    /// # Errors
    ///
    /// See [`FatigueWorker::submit_task`].
    pub fn submit_task_then(&self, task: Task, then: Task) -> Result<(), Rejected> {
        self.enqueue(Job {
            task,
            then: Some(then),
        })
    }

    fn enqueue(&self, job: Job) -> Result<(), Rejected> {
        let mut mailbox = self.shared.mailbox.lock();
        let reason = if mailbox.shutdown {
            WorkerError::ShuttingDown(self.id())
        } else if mailbox.job.is_some() {
            WorkerError::SlotOccupied(self.id())
        } else {
            mailbox.job = Some(job);
            drop(mailbox);
            self.shared.wake.notify_one();
            return Ok(());
        };
        Err(Rejected {
            reason,
            task: job.task,
        })
    }

    /// Asks the thread to exit once any pending or running task is done.
    pub fn request_shutdown(&self) {
        let mut mailbox = self.shared.mailbox.lock();
        mailbox.shutdown = true;
        if matches!(self.state(), WorkerState::Created | WorkerState::Running) {
            self.shared.set_state(WorkerState::ShuttingDown);
        }
        drop(mailbox);
        self.shared.wake.notify_all();
    }

    /// Blocks until the thread has exited.
    ///
    /// Returns immediately for a worker that was never started.
    pub fn await_termination(&self) {
        let handle = self.handle.lock().take();
        match handle {
            Some(join) => {
                if join.join().is_err() {
                    warn!(worker = self.id(), "worker thread panicked outside a task");
                }
            }
            None => self.shared.set_state(WorkerState::Terminated),
        }
    }

    /// Returns the worker id.
    #[must_use]
    pub fn id(&self) -> usize {
        self.shared.id
    }

    /// Returns the fixed fatigue coefficient.
    #[must_use]
    pub fn fatigue(&self) -> f64 {
        self.shared.fatigue
    }

    /// Returns coefficient × busy seconds.
    #[must_use]
    pub fn accumulated_fatigue(&self) -> f64 {
        self.fatigue() * self.time_used().as_secs_f64()
    }

    /// Returns true while a task is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Returns the total time spent running tasks.
    #[must_use]
    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.shared.time_used.load(Ordering::Relaxed))
    }

    /// Returns the total time spent waiting for tasks.
    #[must_use]
    pub fn time_idle(&self) -> Duration {
        Duration::from_nanos(self.shared.time_idle.load(Ordering::Relaxed))
    }

    /// Returns the number of tasks that returned normally.
    #[must_use]
    pub fn tasks_completed(&self) -> u64 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    /// Returns the number of tasks that panicked.
    #[must_use]
    pub fn panicked_tasks(&self) -> u64 {
        self.shared.panicked.load(Ordering::Relaxed)
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }
}

impl fmt::Debug for FatigueWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatigueWorker")
            .field("id", &self.id())
            .field("fatigue", &self.fatigue())
            .field("state", &self.state())
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl PartialEq for FatigueWorker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for FatigueWorker {}

impl PartialOrd for FatigueWorker {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for FatigueWorker {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.fatigue()
            .total_cmp(&other.fatigue())
            .then_with(|| self.id().cmp(&other.id()))
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn run_loop(shared: &Shared) {
    debug!(worker = shared.id, fatigue = shared.fatigue, "worker started");
    let mut idle_since = Instant::now();

    loop {
        let job = {
            let mut mailbox = shared.mailbox.lock();
            loop {
                if let Some(job) = mailbox.job.take() {
                    break Some(job);
                }
                if mailbox.shutdown {
                    break None;
                }
                shared.wake.wait(&mut mailbox);
            }
        };
        let Some(Job { task, then }) = job else { break };

        shared
            .time_idle
            .fetch_add(nanos(idle_since.elapsed()), Ordering::Relaxed);
        shared.busy.store(true, Ordering::Release);
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(task));

        shared
            .time_used
            .fetch_add(nanos(started.elapsed()), Ordering::Relaxed);
        shared.busy.store(false, Ordering::Release);
        match outcome {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                error!(
                    worker = shared.id,
                    panic = panic_message(payload.as_ref()),
                    "task panicked"
                );
            }
        }
        idle_since = Instant::now();
        if let Some(then) = then {
            if panic::catch_unwind(AssertUnwindSafe(then)).is_err() {
                error!(worker = shared.id, "completion hook panicked");
            }
        }
    }

    shared
        .time_idle
        .fetch_add(nanos(idle_since.elapsed()), Ordering::Relaxed);
    shared.set_state(WorkerState::Terminated);
    debug!(worker = shared.id, "worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_runs_task() {
        let worker = FatigueWorker::new(0, 1.0);
        worker.start().unwrap();
        assert_eq!(worker.state(), WorkerState::Running);

        let (tx, rx) = mpsc::channel();
        worker
            .submit_task(Box::new(move || tx.send(42).unwrap()))
            .unwrap();
        assert_eq!(rx.recv_timeout(TIMEOUT), Ok(42));

        worker.request_shutdown();
        worker.await_termination();
        assert_eq!(worker.state(), WorkerState::Terminated);
    }

    #[test]
    fn test_second_pending_task_rejected() {
        let worker = FatigueWorker::new(1, 1.0);
        worker.submit_task(Box::new(|| {})).unwrap();
        let rejected = worker.submit_task(Box::new(|| {})).unwrap_err();
        assert!(matches!(rejected.reason(), WorkerError::SlotOccupied(1)));

        // The handed-back task is still runnable.
        let task = rejected.into_task();
        task();
    }

    #[test]
    fn test_pending_task_runs_after_start() {
        let worker = FatigueWorker::new(2, 1.0);
        let (tx, rx) = mpsc::channel();
        worker
            .submit_task(Box::new(move || tx.send(()).unwrap()))
            .unwrap();
        worker.start().unwrap();
        assert!(rx.recv_timeout(TIMEOUT).is_ok());
        worker.request_shutdown();
        worker.await_termination();
    }

    #[test]
    fn test_start_twice_fails() {
        let worker = FatigueWorker::new(3, 1.0);
        worker.start().unwrap();
        assert!(matches!(worker.start(), Err(WorkerError::AlreadyStarted(3))));
        worker.request_shutdown();
        worker.await_termination();
    }

    #[test]
    fn test_shutdown_idle_worker() {
        let worker = FatigueWorker::new(4, 1.0);
        worker.start().unwrap();
        worker.request_shutdown();
        assert!(matches!(
            worker.submit_task(Box::new(|| {})).map_err(|r| r.reason().to_string()),
            Err(message) if message.contains("shutting down")
        ));
        worker.await_termination();
        assert_eq!(worker.state(), WorkerState::Terminated);
    }

    #[test]
    fn test_unstarted_worker_terminates_immediately() {
        let worker = FatigueWorker::new(5, 1.0);
        worker.request_shutdown();
        worker.await_termination();
        assert_eq!(worker.state(), WorkerState::Terminated);
    }

    #[test]
    fn test_ordering_ties_break_by_id() {
        let a = FatigueWorker::new(0, 1.0);
        let b = FatigueWorker::new(1, 1.0);
        let c = FatigueWorker::new(2, 0.7);
        assert!(a < b);
        assert!(b > a);
        assert!(c < a);
        assert_eq!(a.cmp(&FatigueWorker::new(0, 1.0)), CmpOrdering::Equal);
    }

    #[test]
    fn test_metrics_accumulate() {
        let worker = FatigueWorker::new(6, 2.0);
        worker.start().unwrap();
        let (tx, rx) = mpsc::channel();
        worker
            .submit_task(Box::new(move || {
                thread::sleep(Duration::from_millis(50));
                tx.send(()).unwrap();
            }))
            .unwrap();
        rx.recv_timeout(TIMEOUT).unwrap();

        worker.request_shutdown();
        worker.await_termination();
        assert!(worker.time_used() >= Duration::from_millis(50));
        assert!(worker.accumulated_fatigue() >= 0.1);
        assert_eq!(worker.tasks_completed(), 1);
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_panicking_task_keeps_worker_alive() {
        let worker = FatigueWorker::new(7, 1.0);
        worker.start().unwrap();
        worker
            .submit_task(Box::new(|| panic!("row task failed")))
            .unwrap();

        // The slot frees up once the panicking task was taken.
        let (tx, rx) = mpsc::channel();
        let mut task: Task = Box::new(move || tx.send(()).unwrap());
        loop {
            match worker.submit_task(task) {
                Ok(()) => break,
                Err(rejected) => {
                    task = rejected.into_task();
                    thread::yield_now();
                }
            }
        }
        rx.recv_timeout(TIMEOUT).unwrap();

        worker.request_shutdown();
        worker.await_termination();
        assert_eq!(worker.panicked_tasks(), 1);
        assert_eq!(worker.tasks_completed(), 1);
    }

    #[test]
    fn test_then_sees_booked_time() {
        let worker = Arc::new(FatigueWorker::new(8, 1.0));
        worker.start().unwrap();
        let (tx, rx) = mpsc::channel();
        let observed = Arc::clone(&worker);
        worker
            .submit_task_then(
                Box::new(|| thread::sleep(Duration::from_millis(20))),
                Box::new(move || {
                    tx.send((observed.is_busy(), observed.time_used())).unwrap();
                }),
            )
            .unwrap();

        let (busy, used) = rx.recv_timeout(TIMEOUT).unwrap();
        assert!(!busy);
        assert!(used >= Duration::from_millis(20));
        worker.request_shutdown();
        worker.await_termination();
    }

    #[test]
    fn test_then_runs_after_panic() {
        let worker = FatigueWorker::new(9, 1.0);
        worker.start().unwrap();
        let (tx, rx) = mpsc::channel();
        worker
            .submit_task_then(
                Box::new(|| panic!("row task failed")),
                Box::new(move || tx.send(()).unwrap()),
            )
            .unwrap();
        rx.recv_timeout(TIMEOUT).unwrap();
        worker.request_shutdown();
        worker.await_termination();
        assert_eq!(worker.panicked_tasks(), 1);
    }

    #[test]
    fn test_refused_then_is_dropped() {
        struct Flag(Arc<AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let worker = FatigueWorker::new(10, 1.0);
        worker.submit_task(Box::new(|| {})).unwrap();
        let dropped = Arc::new(AtomicBool::new(false));
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Flag(Arc::clone(&dropped));
        let then_ran = Arc::clone(&ran);
        let rejected = worker
            .submit_task_then(
                Box::new(|| {}),
                Box::new(move || {
                    let _flag = flag;
                    then_ran.store(true, Ordering::SeqCst);
                }),
            )
            .unwrap_err();
        assert!(matches!(rejected.reason(), WorkerError::SlotOccupied(10)));
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
