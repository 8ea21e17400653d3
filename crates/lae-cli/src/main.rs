//! `lae` command-line entry point.
//!
//! ```text
//! lae <THREADS> <INPUT> <OUTPUT> [OPTIONS]
//! ```
//!
//! Reads a JSON script from `INPUT`, resolves it on `THREADS` workers and
//! writes `{"result": ...}` or `{"error": ...}` to `OUTPUT`.
//!
//! Exit codes: 0 on success, 1 when the script could not be evaluated (the
//! error document is still written), 2 when `OUTPUT` cannot be written.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use lae_scheduling::FatiguePolicy;
use tracing_subscriber::{fmt, EnvFilter};

mod error;
mod run;

use run::{execute, Options};

/// Row-parallel linear algebra on a fatigue-ranked worker pool.
#[derive(Debug, Parser)]
#[command(name = "lae")]
#[command(version)]
#[command(about = "Evaluate a JSON matrix expression on a fatigue-ranked worker pool")]
struct Cli {
    /// Number of worker threads
    threads: usize,

    /// Script to evaluate
    input: PathBuf,

    /// Where to write the result or error document
    output: PathBuf,

    /// Seed for the worker fatigue draw
    #[arg(long)]
    seed: Option<u64>,

    /// Lower bound of the fatigue range
    #[arg(long, default_value_t = 0.5)]
    fatigue_min: f64,

    /// Upper bound of the fatigue range (exclusive)
    #[arg(long, default_value_t = 1.5)]
    fatigue_max: f64,

    /// How idle workers are ranked
    #[arg(long, value_enum, default_value_t = Policy::Coefficient)]
    policy: Policy,

    /// Keep n-ary `+` and `*` nodes as written
    #[arg(long)]
    no_normalize: bool,

    /// Print the worker report to stdout
    #[arg(long)]
    report: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Rank by the fixed fatigue coefficient
    Coefficient,
    /// Rank by fatigue times accumulated busy time
    Accumulated,
}

impl From<Policy> for FatiguePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Coefficient => FatiguePolicy::Coefficient,
            Policy::Accumulated => FatiguePolicy::Accumulated,
        }
    }
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            threads: self.threads,
            input: self.input,
            output: self.output,
            seed: self.seed,
            fatigue_range: self.fatigue_min..self.fatigue_max,
            policy: self.policy.into(),
            normalize: !self.no_normalize,
            report: self.report,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    execute(&cli.into_options()).into()
}
