use ndarray::{Array2, ArrayView1, Axis};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("matrix has {actual} columns but {expected} names were given")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Dense, named, row-major feature matrix handed to a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f32>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, values: Array2<f32>) -> Result<Self, MatrixError> {
        if values.ncols() != columns.len() {
            return Err(MatrixError::WidthMismatch {
                expected: columns.len(),
                actual: values.ncols(),
            });
        }
        Ok(Self { columns, values })
    }

    /// Pair names with values whose width is already known to match.
    pub(super) fn from_parts(columns: Vec<String>, values: Array2<f32>) -> Self {
        debug_assert_eq!(columns.len(), values.ncols());
        Self { columns, values }
    }

    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f32>]) -> Result<Self, MatrixError> {
        let width = columns.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MatrixError::RaggedRow {
                    row: row_idx,
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        let values = Array2::from_shape_vec((rows.len(), width), data).map_err(|_| {
            MatrixError::WidthMismatch {
                expected: width,
                actual: 0,
            }
        })?;
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f32> {
        self.values.index_axis(Axis(0), idx)
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.values.axis_iter(Axis(0))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at `row` of the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<f32> {
        let col = self.column_index(column)?;
        self.values.get((row, col)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn from_rows_builds_row_major_matrix() {
        let m = FeatureMatrix::from_rows(names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0, 4.0]])
            .unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.get(1, "a"), Some(3.0));
        assert_eq!(m.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(m.get(0, "missing"), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = FeatureMatrix::from_rows(names(&["a", "b"]), &[vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            MatrixError::RaggedRow {
                row: 0,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn width_must_match_names() {
        let err = FeatureMatrix::new(names(&["a"]), Array2::zeros((1, 2))).unwrap_err();
        assert_eq!(
            err,
            MatrixError::WidthMismatch {
                expected: 1,
                actual: 2
            }
        );
    }
}
