//! One evaluation from script file to output file.

use std::ops::Range;
use std::path::PathBuf;

use lae_engine::{EngineConfig, LinearAlgebraEngine};
use lae_scheduling::{FatiguePolicy, SchedulerConfig, SchedulerReport};
use lae_script::{parse_file, write_error, write_result};
use tracing::{error, info};

use crate::error::{CliError, CliExitCode};

/// Settings for one evaluation.
#[derive(Clone, Debug)]
pub struct Options {
    /// Worker count.
    pub threads: usize,
    /// Script path.
    pub input: PathBuf,
    /// Output document path.
    pub output: PathBuf,
    /// Seed for the fatigue draw.
    pub seed: Option<u64>,
    /// Fatigue coefficients are drawn from this range.
    pub fatigue_range: Range<f64>,
    /// Idle-worker ranking.
    pub policy: FatiguePolicy,
    /// Rewrite n-ary chains into binary ones before running.
    pub normalize: bool,
    /// Print the worker report to stdout.
    pub report: bool,
}

impl Options {
    fn engine_config(&self) -> EngineConfig {
        let mut scheduler = SchedulerConfig::default()
            .with_workers(self.threads)
            .with_fatigue_range(self.fatigue_range.clone())
            .with_policy(self.policy);
        if let Some(seed) = self.seed {
            scheduler = scheduler.with_seed(seed);
        }
        EngineConfig::default().with_scheduler(scheduler)
    }
}

struct Evaluation {
    rows: Vec<Vec<f64>>,
    report: SchedulerReport,
}

/// Evaluates `options.input` and writes the outcome to `options.output`.
#[must_use]
pub fn execute(options: &Options) -> CliExitCode {
    let (written, code) = match evaluate(options) {
        Ok(evaluation) => {
            if options.report {
                println!("{}", evaluation.report);
            } else {
                info!(report = %evaluation.report, "worker report");
            }
            (write_result(&options.output, evaluation.rows), CliExitCode::Success)
        }
        Err(err) => {
            error!(error = %err, "evaluation failed");
            (write_error(&options.output, err.to_string()), CliExitCode::Failure)
        }
    };

    match written {
        Ok(()) => code,
        Err(err) => {
            eprintln!("lae: {err}");
            CliExitCode::OutputFailed
        }
    }
}

fn evaluate(options: &Options) -> Result<Evaluation, CliError> {
    let mut root = parse_file(&options.input)?;
    if options.normalize {
        root.normalize_associativity();
    }

    let mut engine = LinearAlgebraEngine::with_config(options.engine_config())?;
    let outcome = engine.run(&mut root).map(|_| ());
    let report = engine.report();
    engine.shutdown();
    outcome?;

    let rows = root.into_matrix().ok_or(CliError::Unresolved)?;
    Ok(Evaluation { rows, report })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::Value;

    use super::*;

    fn options(dir: &Path, script: &str) -> Options {
        let input = dir.join("in.json");
        fs::write(&input, script).unwrap();
        Options {
            threads: 3,
            input,
            output: dir.join("out.json"),
            seed: Some(1),
            fatigue_range: 0.5..1.5,
            policy: FatiguePolicy::Coefficient,
            normalize: true,
            report: false,
        }
    }

    fn output(options: &Options) -> Value {
        serde_json::from_str(&fs::read_to_string(&options.output).unwrap()).unwrap()
    }

    #[test]
    fn test_success_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(
            dir.path(),
            r#"{"operator": "*", "operands": [[[1, 2], [3, 4]], [[5, 6], [7, 8]]]}"#,
        );
        assert_eq!(execute(&options), CliExitCode::Success);
        assert_eq!(
            output(&options),
            serde_json::json!({"result": [[19.0, 22.0], [43.0, 50.0]]})
        );
    }

    #[test]
    fn test_without_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(
            dir.path(),
            r#"{"operator": "+", "operands": [[[1]], [[2]], [[3]]]}"#,
        );
        options.normalize = false;
        assert_eq!(execute(&options), CliExitCode::Success);
        assert_eq!(output(&options), serde_json::json!({"result": [[6.0]]}));
    }

    #[test]
    fn test_engine_failure_writes_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(
            dir.path(),
            r#"{"operator": "+", "operands": [[[1, 2]], [[1, 2, 3]]]}"#,
        );
        assert_eq!(execute(&options), CliExitCode::Failure);
        let value = output(&options);
        assert!(value["error"].as_str().unwrap().contains("cannot apply add"));
    }

    #[test]
    fn test_parse_failure_writes_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), r#"{"operator": "%", "operands": [[[1]]]}"#);
        assert_eq!(execute(&options), CliExitCode::Failure);
        assert!(output(&options)["error"].is_string());
    }

    #[test]
    fn test_zero_threads_writes_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path(), "[[1]]");
        options.threads = 0;
        assert_eq!(execute(&options), CliExitCode::Failure);
        assert!(output(&options)["error"].is_string());
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path(), "[[1]]");
        options.output = dir.path().join("no-such-dir").join("out.json");
        assert_eq!(execute(&options), CliExitCode::OutputFailed);
    }
}
