//! # lae
//!
//! Row-parallel linear algebra on a fatigue-ranked worker pool.
//!
//! - [`memory`]: lock-ordered shared vectors and copy-on-write matrices
//! - [`scheduling`]: the fatigue scheduler and its workers
//! - [`engine`]: operator trees and the engine that resolves them
//! - [`script`]: JSON scripts in, result documents out
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lae::prelude::*;
//!
//! let mut root = parse_str(r#"{"operator": "T", "operands": [[[1, 2]]]}"#)?;
//! let mut engine = LinearAlgebraEngine::new(2)?;
//! engine.run(&mut root)?;
//! assert_eq!(root.matrix(), Some(&[vec![1.0], vec![2.0]][..]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub use lae_engine as engine;
pub use lae_memory as memory;
pub use lae_scheduling as scheduling;
pub use lae_script as script;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use lae_engine::{ComputationNode, EngineConfig, LinearAlgebraEngine, NodeKind};
    pub use lae_memory::{Orientation, SharedMatrix, SharedVector};
    pub use lae_scheduling::{FatiguePolicy, FatigueScheduler, SchedulerConfig};
    pub use lae_script::{parse_file, parse_str, write_error, write_result, Outcome};
}
