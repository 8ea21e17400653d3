//! # lae-scheduling
//!
//! A fixed pool of long-lived worker threads with fatigue-weighted
//! worker selection.
//!
//! This crate provides:
//! - [`FatigueWorker`]: one thread with a single-slot mailbox and busy/idle counters
//! - [`FatigueScheduler`]: hands each task to the least fatigued idle worker
//! - [`SchedulerConfig`]: pool size, fatigue distribution and selection policy
//! - [`SchedulerReport`]: a snapshot of pool activity
//!
//! ## Scheduling
//!
//! Idle workers wait in a min-priority queue ordered by fatigue, ties broken
//! by worker id. [`FatigueScheduler::submit`] blocks while no worker is idle;
//! [`FatigueScheduler::submit_all`] additionally waits until every accepted
//! task has finished.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod worker;

pub use config::{FatiguePolicy, SchedulerConfig};
pub use error::{Result, SchedulerError, WorkerError};
pub use report::{SchedulerReport, WorkerReport};
pub use scheduler::FatigueScheduler;
pub use worker::{FatigueWorker, Rejected, Task, WorkerState};
