//! Failure kinds and exit codes.

use std::process::ExitCode;

use lae_engine::EngineError;
use lae_script::ScriptError;
use thiserror::Error;

/// Why a script could not be evaluated.
#[derive(Debug, Error)]
pub enum CliError {
    /// The script could not be read or parsed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The engine rejected the tree or a row task failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The root was still an operator after the run.
    #[error("the expression did not resolve to a matrix")]
    Unresolved,
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    /// The result document was written.
    Success = 0,
    /// The error document was written.
    Failure = 1,
    /// The output file could not be written.
    OutputFailed = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}
