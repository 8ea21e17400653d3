//! Output documents.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ScriptError};

/// The outcome of a run, serialized as `{"result": ...}` or `{"error": ...}`.
///
/// Non-finite elements serialize as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The resolved matrix, row-major.
    Result(Vec<Vec<f64>>),
    /// A failure message.
    Error(String),
}

impl Outcome {
    /// Renders the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Json`] if serialization fails.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the rendered document to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Io`] if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut text = self.render()?;
        text.push('\n');
        fs::write(path, text).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            error = matches!(self, Outcome::Error(_)),
            "outcome written"
        );
        Ok(())
    }
}

/// Writes `{"result": rows}` to `path`.
///
/// # Errors
///
/// See [`Outcome::write`].
pub fn write_result(path: impl AsRef<Path>, rows: Vec<Vec<f64>>) -> Result<()> {
    Outcome::Result(rows).write(path)
}

/// Writes `{"error": message}` to `path`.
///
/// # Errors
///
/// See [`Outcome::write`].
pub fn write_error(path: impl AsRef<Path>, message: impl Into<String>) -> Result<()> {
    Outcome::Error(message.into()).write(path)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_render_result() {
        let text = Outcome::Result(vec![vec![1.0, 2.5]]).render().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"result": [[1.0, 2.5]]}));
    }

    #[test]
    fn test_render_error() {
        let text = Outcome::Error("boom".into()).render().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }

    #[test]
    fn test_non_finite_renders_null() {
        let text = Outcome::Result(vec![vec![f64::NAN]]).render().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"result": [[null]]}));
    }

    #[test]
    fn test_write_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = write_error(&path, "x").unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }
}
