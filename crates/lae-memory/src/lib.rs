//! # lae-memory
//!
//! Shared row/column storage for the lae engine.
//!
//! This crate provides:
//! - [`SharedVector`]: one row or column of `f64` values behind a reader/writer lock
//! - [`SharedMatrix`]: a copy-on-write collection of vectors that is replaced wholesale
//! - A process-wide lock order so that operations touching several vectors
//!   at once never deadlock
//!
//! ## Locking
//!
//! Every vector and matrix draws a unique identity from one counter at
//! construction. Operations over two vectors lock the lower identity first;
//! operations over a whole matrix lock its vectors in ascending identity.
//! Combining a vector with itself goes through a single fallback mutex and
//! takes the vector's write lock once.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod lock_order;
pub mod matrix;
pub mod orientation;
pub mod vector;

pub use error::{MemoryError, Result};
pub use matrix::SharedMatrix;
pub use orientation::Orientation;
pub use vector::SharedVector;

#[cfg(test)]
mod proptests;
