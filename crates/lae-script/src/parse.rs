//! Script parsing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use lae_engine::{ComputationNode, NodeKind};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, ScriptError};

/// Parses a script from a string.
///
/// # Errors
///
/// Returns [`ScriptError::Json`] for malformed JSON and the structural
/// variants of [`ScriptError`] for a well-formed document that is not a
/// valid tree.
pub fn parse_str(input: &str) -> Result<ComputationNode> {
    let value: Value = serde_json::from_str(input)?;
    parse_value(&value)
}

/// Parses a script from a reader.
///
/// # Errors
///
/// See [`parse_str`].
pub fn parse_reader<R: Read>(reader: R) -> Result<ComputationNode> {
    let value: Value = serde_json::from_reader(reader)?;
    parse_value(&value)
}

/// Parses a script file.
///
/// # Errors
///
/// Returns [`ScriptError::Io`] if the file cannot be opened, otherwise see
/// [`parse_str`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<ComputationNode> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root = parse_reader(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        operators = root.operator_count(),
        depth = root.depth(),
        "script parsed"
    );
    Ok(root)
}

/// Converts an already-decoded JSON value into a tree.
///
/// # Errors
///
/// See [`parse_str`].
pub fn parse_value(value: &Value) -> Result<ComputationNode> {
    parse_node(value, "$".to_owned())
}

fn parse_node(value: &Value, at: String) -> Result<ComputationNode> {
    match value {
        Value::Array(rows) => parse_matrix(rows, &at).map(ComputationNode::leaf),
        Value::Object(fields) => parse_operator(fields, at),
        other => Err(unexpected("a matrix or an operator object", other, at)),
    }
}

fn parse_operator(fields: &Map<String, Value>, at: String) -> Result<ComputationNode> {
    let symbol = match fields.get("operator") {
        Some(Value::String(symbol)) => symbol,
        Some(other) => {
            return Err(unexpected("an operator string", other, format!("{at}.operator")));
        }
        None => {
            return Err(ScriptError::MissingField {
                field: "operator",
                at,
            });
        }
    };
    let kind = NodeKind::from_symbol(symbol).ok_or_else(|| ScriptError::UnknownOperator {
        symbol: symbol.clone(),
        at: at.clone(),
    })?;

    let operands = match fields.get("operands") {
        Some(Value::Array(operands)) => operands,
        Some(other) => {
            return Err(unexpected("an operand array", other, format!("{at}.operands")));
        }
        None => {
            return Err(ScriptError::MissingField {
                field: "operands",
                at,
            });
        }
    };
    if operands.is_empty() {
        return Err(ScriptError::NoOperands {
            symbol: symbol.clone(),
            at,
        });
    }

    let children = operands
        .iter()
        .enumerate()
        .map(|(i, operand)| parse_node(operand, format!("{at}.operands[{i}]")))
        .collect::<Result<Vec<_>>>()?;
    Ok(ComputationNode::operator(kind, children))
}

fn parse_matrix(rows: &[Value], at: &str) -> Result<Vec<Vec<f64>>> {
    let mut matrix = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        let Value::Array(elements) = row else {
            return Err(unexpected("a row array", row, format!("{at}[{r}]")));
        };
        let parsed = elements
            .iter()
            .enumerate()
            .map(|(c, element)| {
                element.as_f64().ok_or_else(|| ScriptError::InvalidNumber {
                    at: format!("{at}[{r}][{c}]"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        matrix.push(parsed);
    }

    if let Some(expected) = matrix.first().map(Vec::len) {
        if let Some((row, found)) = matrix
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(ScriptError::NotRectangular {
                at: at.to_owned(),
                row,
                expected,
                found,
            });
        }
    }
    Ok(matrix)
}

fn unexpected(expected: &'static str, found: &Value, at: String) -> ScriptError {
    ScriptError::UnexpectedValue {
        expected,
        found: type_name(found),
        at,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
