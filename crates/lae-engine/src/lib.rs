//! # lae-engine
//!
//! Resolves a tree of matrix operations by running each operator row by row
//! on a [`FatigueScheduler`](lae_scheduling::FatigueScheduler).
//!
//! This crate provides:
//! - [`ComputationNode`]: the operator tree (`Add`, `Multiply`, `Negate`, `Transpose`
//!   over `Matrix` leaves)
//! - [`LinearAlgebraEngine`]: repeatedly finds a node whose operands are all
//!   leaves, computes it in parallel, and collapses it into a leaf
//!
//! ## Example
//!
//! ```rust,ignore
//! use lae_engine::{ComputationNode, LinearAlgebraEngine, NodeKind};
//!
//! let mut root = ComputationNode::operator(
//!     NodeKind::Add,
//!     vec![
//!         ComputationNode::leaf(vec![vec![1.0, 2.0]]),
//!         ComputationNode::leaf(vec![vec![10.0, 20.0]]),
//!     ],
//! );
//! let mut engine = LinearAlgebraEngine::new(4)?;
//! engine.run(&mut root)?;
//! assert_eq!(root.matrix(), Some(&[vec![11.0, 22.0]][..]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod node;

pub use engine::{EngineConfig, LinearAlgebraEngine};
pub use error::{EngineError, Result};
pub use node::{ComputationNode, NodeKind};
