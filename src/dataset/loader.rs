//! JSON-lines dataset loader.
//!
//! Each non-empty line is one JSON object mapping column names to scalar
//! values. Column order follows the first appearance of each key.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use super::Frame;
use crate::record::RawValue;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid record on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("line {line} is not a JSON object")]
    NotAnObject { line: usize },
    #[error("field {field} on line {line} is not a scalar value")]
    NonScalar { line: usize, field: String },
    #[error("dataset is empty")]
    Empty,
}

/// Load a JSON-lines file into a [`Frame`].
pub fn load_jsonl(path: &Path) -> Result<Frame, DatasetLoadError> {
    let file = File::open(path)?;
    let frame = parse_jsonl(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        rows = frame.n_rows(),
        columns = frame.n_columns(),
        "Loaded dataset"
    );
    Ok(frame)
}

/// Parse JSON-lines records from any reader.
pub fn parse_jsonl<R: Read>(reader: BufReader<R>) -> Result<Frame, DatasetLoadError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let value: Value = serde_json::from_str(&line).map_err(|source| DatasetLoadError::Json {
            line: line_no,
            source,
        })?;
        let Value::Object(object) = value else {
            return Err(DatasetLoadError::NotAnObject { line: line_no });
        };
        rows.push(object_to_row(object, line_no)?);
    }
    if rows.is_empty() {
        return Err(DatasetLoadError::Empty);
    }
    Ok(Frame::from_rows(rows))
}

fn object_to_row(
    object: Map<String, Value>,
    line: usize,
) -> Result<Vec<(String, RawValue)>, DatasetLoadError> {
    object
        .into_iter()
        .map(|(field, value)| {
            if value.is_array() || value.is_object() {
                return Err(DatasetLoadError::NonScalar { line, field });
            }
            let raw: RawValue = serde_json::from_value(value)
                .map_err(|source| DatasetLoadError::Json { line, source })?;
            Ok((field, raw))
        })
        .collect()
}
