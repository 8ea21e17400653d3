//! The tree-resolving engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lae_memory::{MemoryError, SharedMatrix};
use lae_scheduling::{FatigueScheduler, SchedulerConfig, SchedulerReport, Task};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::node::{ComputationNode, NodeKind};

/// Configuration for [`LinearAlgebraEngine`].
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Pool used for row tasks.
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Sets the number of workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.scheduler = self.scheduler.with_workers(workers);
        self
    }

    /// Replaces the scheduler configuration.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }
}

/// Per-row operation run by one task.
#[derive(Clone, Copy, Debug)]
enum RowOp {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl RowOp {
    fn for_kind(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Add => Some(RowOp::Add),
            NodeKind::Multiply => Some(RowOp::Multiply),
            NodeKind::Negate => Some(RowOp::Negate),
            NodeKind::Transpose => Some(RowOp::Transpose),
            NodeKind::Matrix => None,
        }
    }

    fn apply(self, left: &SharedMatrix, right: &SharedMatrix, row: usize) -> lae_memory::Result<()> {
        let vector = left.get(row)?;
        match self {
            RowOp::Add => {
                let other = right.get(row)?;
                vector.add(&other)
            }
            RowOp::Multiply => vector.row_times_matrix(right),
            RowOp::Negate => {
                vector.negate();
                Ok(())
            }
            RowOp::Transpose => {
                vector.transpose();
                Ok(())
            }
        }
    }
}

/// Outcomes reported by the row tasks of one batch.
#[derive(Default)]
struct RowSink {
    finished: AtomicUsize,
    failures: Mutex<Vec<(usize, MemoryError)>>,
}

impl RowSink {
    fn record(&self, row: usize, outcome: lae_memory::Result<()>) {
        if let Err(err) = outcome {
            self.failures.lock().push((row, err));
        }
        self.finished.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self, expected: usize) -> Result<()> {
        let mut failures = std::mem::take(&mut *self.failures.lock());
        failures.sort_unstable_by_key(|(row, _)| *row);
        if let Some((row, source)) = failures.into_iter().next() {
            return Err(EngineError::Task { row, source });
        }
        let finished = self.finished.load(Ordering::Acquire);
        if finished < expected {
            return Err(EngineError::TaskPanicked {
                failed: expected - finished,
                expected,
            });
        }
        Ok(())
    }
}

/// Resolves [`ComputationNode`] trees on a fatigue-ranked worker pool.
///
/// The engine owns two working matrices. Each operator loads its operands into
/// them, runs one task per row of the left operand, and reads the left matrix
/// back as the result.
pub struct LinearAlgebraEngine {
    scheduler: FatigueScheduler,
    left: Arc<SharedMatrix>,
    right: Arc<SharedMatrix>,
}

impl LinearAlgebraEngine {
    /// Creates an engine with `workers` threads and default fatigue settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be started.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_config(EngineConfig::default().with_workers(workers))
    }

    /// Creates an engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler configuration is invalid or a worker
    /// thread cannot be spawned.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let scheduler = FatigueScheduler::with_config(config.scheduler)?;
        Ok(Self {
            scheduler,
            left: Arc::new(SharedMatrix::new()),
            right: Arc::new(SharedMatrix::new()),
        })
    }

    /// Resolves `root` until it is a single matrix leaf and returns it.
    ///
    /// Nodes are resolved in post-order, leftmost first. A leaf root is
    /// returned untouched and `None` yields `None`.
    ///
    /// # Errors
    ///
    /// Returns the first arity, shape or task error. Nodes resolved before the
    /// failure stay resolved, and the engine can be used again.
    pub fn run<'a>(
        &mut self,
        root: impl Into<Option<&'a mut ComputationNode>>,
    ) -> Result<Option<&'a mut ComputationNode>> {
        let Some(root) = root.into() else {
            return Ok(None);
        };
        if root.is_leaf() {
            return Ok(Some(root));
        }

        debug!(
            operators = root.operator_count(),
            depth = root.depth(),
            "resolving tree"
        );
        let mut resolved = 0_usize;
        while let Some(node) = root.find_resolvable() {
            self.resolve(node)?;
            resolved += 1;
        }
        debug!(resolved, "tree resolved");
        Ok(Some(root))
    }

    /// Returns a snapshot of the worker pool.
    #[must_use]
    pub fn report(&self) -> SchedulerReport {
        self.scheduler.report()
    }

    /// Returns the worker pool.
    #[must_use]
    pub fn scheduler(&self) -> &FatigueScheduler {
        &self.scheduler
    }

    /// Stops the worker pool and joins its threads.
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }

    fn resolve(&self, node: &mut ComputationNode) -> Result<()> {
        let kind = node.kind();
        let found = node.children().len();
        trace!(%kind, operands = found, "resolving node");

        if RowOp::for_kind(kind).is_none() {
            return Err(EngineError::UnsupportedOperator(kind));
        }
        if kind.is_unary() {
            if found != 1 {
                return Err(EngineError::Arity {
                    kind,
                    expected: "1",
                    found,
                });
            }
            let rows = self.compute(kind, operand(node, 0)?, None)?;
            node.resolve(rows);
            return Ok(());
        }

        if found < 2 {
            return Err(EngineError::Arity {
                kind,
                expected: "at least 2",
                found,
            });
        }
        // Longer chains fold left to right, two operands at a time.
        while node.children().len() > 2 {
            let rows = self.compute(kind, operand(node, 0)?, Some(operand(node, 1)?))?;
            node.fold_front(rows);
        }
        let rows = self.compute(kind, operand(node, 0)?, Some(operand(node, 1)?))?;
        node.resolve(rows);
        Ok(())
    }

    fn compute(
        &self,
        kind: NodeKind,
        lhs: &[Vec<f64>],
        rhs: Option<&[Vec<f64>]>,
    ) -> Result<Vec<Vec<f64>>> {
        let op = RowOp::for_kind(kind).ok_or(EngineError::UnsupportedOperator(kind))?;
        if let Some(rhs) = rhs {
            check_shapes(kind, lhs, rhs)?;
        }

        self.left.load_row_major(lhs)?;
        if let Some(rhs) = rhs {
            self.right.load_row_major(rhs)?;
        }

        let rows = self.left.len();
        let sink = Arc::new(RowSink::default());
        let tasks = (0..rows).map(|row| {
            let left = Arc::clone(&self.left);
            let right = Arc::clone(&self.right);
            let sink = Arc::clone(&sink);
            Box::new(move || sink.record(row, op.apply(&left, &right, row))) as Task
        });
        self.scheduler.submit_all(tasks)?;
        sink.finish(rows)?;

        Ok(self.left.read_row_major())
    }
}

impl std::fmt::Debug for LinearAlgebraEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearAlgebraEngine")
            .field("scheduler", &self.scheduler)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

impl Drop for LinearAlgebraEngine {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}

fn operand(node: &ComputationNode, index: usize) -> Result<&[Vec<f64>]> {
    node.children()[index]
        .matrix()
        .ok_or(EngineError::MissingData {
            kind: node.kind(),
            index,
        })
}

fn shape(rows: &[Vec<f64>]) -> (usize, usize) {
    (rows.len(), rows.first().map_or(0, Vec::len))
}

fn check_shapes(kind: NodeKind, lhs: &[Vec<f64>], rhs: &[Vec<f64>]) -> Result<()> {
    let left = shape(lhs);
    let right = shape(rhs);
    let compatible = match kind {
        NodeKind::Add => left == right,
        NodeKind::Multiply => left.1 == right.0 && (left.0 == 0 || right.0 > 0),
        _ => true,
    };
    if compatible {
        Ok(())
    } else {
        Err(EngineError::ShapeMismatch { kind, left, right })
    }
}
