use thiserror::Error;

use crate::record::{RawValue, Record};

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("column {name} has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate column {0}")]
    DuplicateColumn(String),
}

/// A named column of raw values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<RawValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<RawValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Columnar table of raw values with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    /// Build a frame from whole columns; every column must have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, FrameError> {
        let n_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for (idx, column) in columns.iter().enumerate() {
            if column.values.len() != n_rows {
                return Err(FrameError::LengthMismatch {
                    name: column.name.clone(),
                    expected: n_rows,
                    actual: column.values.len(),
                });
            }
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(FrameError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Build a frame from rows of `(field, value)` pairs.
    ///
    /// Column order is the first-seen order of field names across rows. Fields
    /// absent from a row are filled with [`RawValue::Missing`].
    pub fn from_rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (String, RawValue)>,
    {
        let mut columns: Vec<Column> = Vec::new();
        let mut n_rows = 0usize;
        for row in rows {
            for (name, value) in row {
                let idx = match columns.iter().position(|c| c.name == name) {
                    Some(idx) => idx,
                    None => {
                        columns.push(Column::new(name, vec![RawValue::Missing; n_rows]));
                        columns.len() - 1
                    }
                };
                let column = &mut columns[idx];
                if column.values.len() == n_rows {
                    column.values.push(value);
                } else {
                    // Repeated key within one row: keep the last value.
                    column.values[n_rows] = value;
                }
            }
            n_rows += 1;
            for column in &mut columns {
                column.values.resize(n_rows, RawValue::Missing);
            }
        }
        Self { columns, n_rows }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Materialize row `idx` as a record (all columns, including missing cells).
    pub fn record(&self, idx: usize) -> Option<Record> {
        if idx >= self.n_rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[idx].clone()))
                .collect(),
        )
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.n_rows).filter_map(|idx| self.record(idx))
    }

    /// Copy of the frame without the named column; unknown names are ignored.
    pub fn without_column(&self, name: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Keep only the rows whose indices are listed, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    indices
                        .iter()
                        .filter_map(|&i| c.values.get(i).cloned())
                        .collect(),
                )
            })
            .collect();
        let n_rows = indices.iter().filter(|&&i| i < self.n_rows).count();
        Self { columns, n_rows }
    }
}
