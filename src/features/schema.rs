//! Canonical feature column list and reconciliation against it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use super::matrix::FeatureMatrix;

/// File name of the persisted column list inside an artifact directory.
pub const FEATURE_COLUMNS_FILE_NAME: &str = "feature_columns.txt";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read feature columns from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write feature columns to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Feature column list is empty")]
    Empty,
    #[error("Feature column {0} is listed more than once")]
    Duplicate(String),
    #[error("Feature column names must not contain line breaks: {0:?}")]
    InvalidName(String),
}

/// Columns that had to be added or removed to match the schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Canonical columns absent from the input, filled with `0`.
    pub filled: Vec<String>,
    /// Input columns unknown to the schema, dropped.
    pub dropped: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.filled.is_empty() && self.dropped.is_empty()
    }
}

/// Ordered list of column names a model expects.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if name.contains(['\n', '\r']) {
                return Err(SchemaError::InvalidName(name.clone()));
            }
            if index.insert(name.clone(), idx).is_some() {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }
        Ok(Self { columns, index })
    }

    /// Read a column list: one name per line, surrounding whitespace and blank lines ignored.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn save(&self, path: &Path) -> Result<(), SchemaError> {
        let mut text = self.columns.join("\n");
        text.push('\n');
        std::fs::write(path, text).map_err(|source| SchemaError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Lay out one sparse encoded row in schema order.
    ///
    /// Missing schema columns become `0`; unknown columns are dropped. When a
    /// column appears more than once the last value wins.
    pub fn reconcile_row(&self, row: &[(String, f32)]) -> (Vec<f32>, ReconcileReport) {
        let mut values = vec![0.0f32; self.columns.len()];
        let mut seen = vec![false; self.columns.len()];
        let mut report = ReconcileReport::default();
        for (name, value) in row {
            match self.position(name) {
                Some(idx) => {
                    values[idx] = *value;
                    seen[idx] = true;
                }
                None => report.dropped.push(name.clone()),
            }
        }
        report.filled = self
            .columns
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|(name, _)| name.clone())
            .collect();
        (values, report)
    }

    /// Reindex a matrix onto the schema's columns.
    ///
    /// Reconciling a matrix that already has exactly the schema's columns in
    /// order returns an equal matrix and a clean report.
    pub fn reconcile(&self, matrix: &FeatureMatrix) -> (FeatureMatrix, ReconcileReport) {
        let n_rows = matrix.n_rows();
        let mut values = Array2::<f32>::zeros((n_rows, self.columns.len()));
        let mut report = ReconcileReport::default();
        let mut seen = vec![false; self.columns.len()];
        for (src_idx, name) in matrix.columns().iter().enumerate() {
            match self.position(name) {
                Some(dst_idx) => {
                    values
                        .column_mut(dst_idx)
                        .assign(&matrix.values().column(src_idx));
                    seen[dst_idx] = true;
                }
                None => report.dropped.push(name.clone()),
            }
        }
        report.filled = self
            .columns
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|(name, _)| name.clone())
            .collect();
        (FeatureMatrix::from_parts(self.columns.clone(), values), report)
    }
}
