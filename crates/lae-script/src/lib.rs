//! # lae-script
//!
//! JSON front end for the engine.
//!
//! A script node is either a matrix, written as an array of equal-length
//! number arrays, or an operator object:
//!
//! ```json
//! {"operator": "+", "operands": [[[1, 2]], [[3, 4]]]}
//! ```
//!
//! Operators are `+` (add), `*` (multiply), `-` (negate) and `T` (transpose).
//! [`parse_file`] builds a [`ComputationNode`](lae_engine::ComputationNode);
//! [`write_result`] and [`write_error`] produce the output document.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod emit;
pub mod error;
pub mod parse;

pub use emit::{write_error, write_result, Outcome};
pub use error::{Result, ScriptError};
pub use parse::{parse_file, parse_reader, parse_str, parse_value};
