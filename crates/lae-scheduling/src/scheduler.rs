//! The fatigue-weighted worker pool.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::config::{FatiguePolicy, SchedulerConfig};
use crate::error::{Result, SchedulerError};
use crate::report::{SchedulerReport, WorkerReport};
use crate::worker::{FatigueWorker, Task};

/// An idle worker together with the key it was ranked by when offered.
///
/// The key is captured once, so a worker's rank cannot change while it sits
/// in the heap.
struct IdleEntry {
    key: f64,
    worker: Arc<FatigueWorker>,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    // Reversed: `BinaryHeap` pops the greatest entry, we want the least fatigued.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.worker.id().cmp(&self.worker.id()))
    }
}

struct PoolShared {
    policy: FatiguePolicy,
    idle: Mutex<BinaryHeap<IdleEntry>>,
    idle_ready: Condvar,
    in_flight: Mutex<usize>,
    drained: Condvar,
    closed: AtomicBool,
}

impl PoolShared {
    fn key(&self, worker: &FatigueWorker) -> f64 {
        match self.policy {
            FatiguePolicy::Coefficient => worker.fatigue(),
            FatiguePolicy::Accumulated => worker.accumulated_fatigue(),
        }
    }

    fn offer(&self, worker: Arc<FatigueWorker>) {
        let key = self.key(&worker);
        self.idle.lock().push(IdleEntry { key, worker });
        self.idle_ready.notify_one();
    }

    /// Pops the least fatigued idle worker, blocking while there is none.
    fn take(&self) -> Result<Arc<FatigueWorker>> {
        let mut idle = self.idle.lock();
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(SchedulerError::ShutDown);
            }
            if let Some(entry) = idle.pop() {
                return Ok(entry.worker);
            }
            self.idle_ready.wait(&mut idle);
        }
    }

    fn begin(&self) {
        *self.in_flight.lock() += 1;
    }

    fn finish(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut in_flight = self.in_flight.lock();
        while *in_flight != 0 {
            self.drained.wait(&mut in_flight);
        }
    }
}

/// Returns a worker to the idle set and settles the in-flight count on drop.
struct Completion {
    pool: Arc<PoolShared>,
    worker: Arc<FatigueWorker>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.pool.offer(Arc::clone(&self.worker));
        self.pool.finish();
    }
}

/// A fixed pool of [`FatigueWorker`]s.
///
/// Each submitted task goes to the idle worker with the lowest fatigue key.
/// Submitters block while every worker is busy.
pub struct FatigueScheduler {
    workers: Vec<Arc<FatigueWorker>>,
    shared: Arc<PoolShared>,
    shut_down: AtomicBool,
}

impl FatigueScheduler {
    /// Creates a pool of `workers` threads with default fatigue settings.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkerCount`] if `workers == 0`.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_config(SchedulerConfig::default().with_workers(workers))
    }

    /// Creates and starts a pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a worker thread
    /// cannot be spawned. Workers started before the failure are stopped.
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(PoolShared {
            policy: config.policy,
            idle: Mutex::new(BinaryHeap::with_capacity(config.workers)),
            idle_ready: Condvar::new(),
            in_flight: Mutex::new(0),
            drained: Condvar::new(),
            closed: AtomicBool::new(false),
        });

        let mut workers: Vec<Arc<FatigueWorker>> = Vec::with_capacity(config.workers);
        for (id, fatigue) in config.draw_fatigues().into_iter().enumerate() {
            let worker = Arc::new(FatigueWorker::new(id, fatigue));
            if let Err(err) = worker.start() {
                for started in &workers {
                    stop_worker(started);
                }
                return Err(err.into());
            }
            workers.push(worker);
        }
        for worker in &workers {
            shared.offer(Arc::clone(worker));
        }

        debug!(
            workers = workers.len(),
            policy = ?config.policy,
            "scheduler started"
        );
        Ok(Self {
            workers,
            shared,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Hands `task` to the least fatigued idle worker.
    ///
    /// Blocks while no worker is idle. Returns once the task has been placed
    /// in a worker's mailbox, not once it has run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutDown`] after [`FatigueScheduler::shutdown`].
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_task(Box::new(task))
    }

    /// Boxed form of [`FatigueScheduler::submit`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutDown`] after [`FatigueScheduler::shutdown`].
    pub fn submit_task(&self, task: Task) -> Result<()> {
        let mut task = task;
        loop {
            let worker = self.shared.take()?;
            self.shared.begin();

            // The task sits in a cell so it can be recovered if the worker
            // turns it down.
            let cell = Arc::new(Mutex::new(Some(task)));
            let completion = Completion {
                pool: Arc::clone(&self.shared),
                worker: Arc::clone(&worker),
            };
            let wrapped: Task = {
                let cell = Arc::clone(&cell);
                Box::new(move || {
                    let task = cell.lock().take();
                    if let Some(task) = task {
                        task();
                    }
                })
            };
            // Runs once the worker has booked the task's busy time.
            let then: Task = Box::new(move || drop(completion));

            match worker.submit_task_then(wrapped, then) {
                Ok(()) => {
                    trace!(worker = worker.id(), "task dispatched");
                    return Ok(());
                }
                Err(rejected) => {
                    warn!(
                        worker = worker.id(),
                        reason = %rejected.reason(),
                        "worker refused task, retrying"
                    );
                    let recovered = cell.lock().take();
                    // The refused completion was dropped, which offered the
                    // worker back and undid the count.
                    drop(rejected);
                    match recovered {
                        Some(original) => task = original,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Submits every task in order, then waits until all of them have finished.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutDown`] if the pool was shut down. Tasks
    /// already accepted are still waited for.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut submitted = 0_usize;
        let mut outcome = Ok(());
        for task in tasks {
            if let Err(err) = self.submit_task(task) {
                outcome = Err(err);
                break;
            }
            submitted += 1;
        }
        self.shared.wait_drained();
        trace!(tasks = submitted, "batch drained");
        outcome
    }

    /// Waits for in-flight tasks, then stops and joins every worker.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.wait_drained();
        self.shared.closed.store(true, Ordering::Release);
        {
            // Wake submitters blocked on an empty idle set.
            let _idle = self.shared.idle.lock();
            self.shared.idle_ready.notify_all();
        }
        for worker in &self.workers {
            worker.request_shutdown();
        }
        for worker in &self.workers {
            worker.await_termination();
        }
        debug!(workers = self.workers.len(), "scheduler shut down");
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns the number of accepted tasks that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.shared.in_flight.lock()
    }

    /// Returns the workers in id order.
    #[must_use]
    pub fn workers(&self) -> &[Arc<FatigueWorker>] {
        &self.workers
    }

    /// Returns the ranking policy.
    #[must_use]
    pub fn policy(&self) -> FatiguePolicy {
        self.shared.policy
    }

    /// Returns a snapshot of pool activity.
    #[must_use]
    pub fn report(&self) -> SchedulerReport {
        SchedulerReport {
            in_flight: self.in_flight(),
            policy: self.policy(),
            workers: self
                .workers
                .iter()
                .map(|w| WorkerReport::from_worker(w))
                .collect(),
        }
    }
}

impl fmt::Debug for FatigueScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatigueScheduler")
            .field("workers", &self.workers)
            .field("policy", &self.shared.policy)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Drop for FatigueScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn stop_worker(worker: &FatigueWorker) {
    worker.request_shutdown();
    worker.await_termination();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            FatigueScheduler::new(0),
            Err(SchedulerError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_submit_runs_task() {
        let scheduler = FatigueScheduler::new(3).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler.submit(move || tx.send(()).unwrap()).unwrap();
        assert!(rx.recv_timeout(TIMEOUT).is_ok());
        scheduler.shutdown();
    }

    #[test]
    fn test_submit_all_empty_batch() {
        let scheduler = FatigueScheduler::new(2).unwrap();
        scheduler.submit_all(Vec::new()).unwrap();
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn test_submit_all_runs_each_task_once() {
        let scheduler = FatigueScheduler::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..50)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Task
            })
            .collect();
        scheduler.submit_all(tasks).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn test_least_fatigued_worker_chosen() {
        let config = SchedulerConfig::default().with_fatigues(vec![1.4, 0.6, 0.9]);
        let scheduler = FatigueScheduler::with_config(config).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler
            .submit(move || {
                let name = thread::current().name().map(str::to_owned);
                tx.send(name).unwrap();
            })
            .unwrap();
        assert_eq!(
            rx.recv_timeout(TIMEOUT).unwrap().as_deref(),
            Some("lae-worker-1")
        );
    }

    #[test]
    fn test_ties_resolve_to_lowest_id() {
        let config = SchedulerConfig::default().with_fatigues(vec![1.0, 1.0, 1.0]);
        let scheduler = FatigueScheduler::with_config(config).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler
            .submit(move || {
                tx.send(thread::current().name().map(str::to_owned)).unwrap();
            })
            .unwrap();
        assert_eq!(
            rx.recv_timeout(TIMEOUT).unwrap().as_deref(),
            Some("lae-worker-0")
        );
    }

    #[test]
    fn test_shutdown_twice_is_noop() {
        let scheduler = FatigueScheduler::new(2).unwrap();
        scheduler.shutdown();
        scheduler.shutdown();
        assert!(matches!(
            scheduler.submit(|| {}),
            Err(SchedulerError::ShutDown)
        ));
        assert!(scheduler
            .workers()
            .iter()
            .all(|w| w.state() == crate::WorkerState::Terminated));
    }

    #[test]
    fn test_report_lists_workers() {
        let scheduler = FatigueScheduler::new(2).unwrap();
        let report = scheduler.report();
        assert_eq!(report.in_flight, 0);
        assert_eq!(report.workers.len(), 2);
        let text = report.to_string();
        assert!(text.contains("Worker Report"));
        assert!(text.contains("in_flight"));
        assert!(text.contains("Worker #0"));
        assert!(text.contains("Worker #1"));
    }
}
