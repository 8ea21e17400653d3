//! Scheduler configuration.

use std::ops::Range;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::{Result, SchedulerError};

/// How idle workers are ranked when a task needs a worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FatiguePolicy {
    /// Rank by the fixed fatigue coefficient.
    #[default]
    Coefficient,
    /// Rank by coefficient × busy time accumulated so far.
    Accumulated,
}

/// Configuration for a [`FatigueScheduler`](crate::FatigueScheduler).
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Range from which each worker's coefficient is drawn.
    pub fatigue_range: Range<f64>,
    /// Random seed for reproducibility. A fresh seed is drawn when `None`.
    pub seed: Option<u64>,
    /// Worker ranking policy.
    pub policy: FatiguePolicy,
    /// Explicit coefficients, one per worker. Overrides `fatigue_range`.
    pub fatigues: Option<Vec<f64>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            fatigue_range: 0.5..1.5,
            seed: None,
            policy: FatiguePolicy::default(),
            fatigues: None,
        }
    }
}

impl SchedulerConfig {
    /// Sets the number of workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the range coefficients are drawn from.
    #[must_use]
    pub fn with_fatigue_range(mut self, range: Range<f64>) -> Self {
        self.fatigue_range = range;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the ranking policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FatiguePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Uses explicit coefficients; the worker count becomes `fatigues.len()`.
    #[must_use]
    pub fn with_fatigues(mut self, fatigues: Vec<f64>) -> Self {
        self.workers = fatigues.len();
        self.fatigues = Some(fatigues);
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkerCount`] for an empty pool,
    /// [`SchedulerError::InvalidFatigueRange`] for a bad range and
    /// [`SchedulerError::InvalidFatigue`] for a bad explicit coefficient.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SchedulerError::InvalidWorkerCount(self.workers));
        }
        match &self.fatigues {
            Some(fatigues) => {
                if fatigues.len() != self.workers {
                    return Err(SchedulerError::InvalidWorkerCount(self.workers));
                }
                if let Some(bad) = fatigues.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
                    return Err(SchedulerError::InvalidFatigue(*bad));
                }
            }
            None => {
                let Range { start, end } = self.fatigue_range;
                if !(start.is_finite() && end.is_finite() && start > 0.0 && start < end) {
                    return Err(SchedulerError::InvalidFatigueRange {
                        min: start,
                        max: end,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns one coefficient per worker.
    pub(crate) fn draw_fatigues(&self) -> Vec<f64> {
        if let Some(fatigues) = &self.fatigues {
            return fatigues.clone();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        (0..self.workers)
            .map(|_| rng.gen_range(self.fatigue_range.clone()))
            .collect()
    }
}
