//! Training-time feature builder.

use std::collections::BTreeSet;

use thiserror::Error;

use super::binary::BinaryMap;
use super::kind::{ColumnKind, profile_column};
use super::matrix::{FeatureMatrix, MatrixError};
use super::plan::{EncodingPlan, FieldRule, FieldSpec};
use super::schema::{FeatureSchema, SchemaError};
use super::category_label;
use crate::dataset::{Column, Frame};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("dataset has no rows")]
    EmptyDataset,
    #[error("target column {column} must have exactly two classes, found {found:?}")]
    TargetNotBinary { column: String, found: Vec<String> },
    #[error("target column {column} is missing a value on row {row}")]
    MissingLabel { column: String, row: usize },
    #[error("no usable feature columns")]
    NoFeatures,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// A categorical column left out of the encoded output.
#[derive(Debug, Clone, PartialEq)]
pub struct UnusableColumn {
    pub name: String,
    /// Distinct non-missing categories observed (0 or 1).
    pub distinct: usize,
}

/// What the builder decided for each column, for logging and inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub numeric: Vec<String>,
    pub boolean: Vec<String>,
    pub binary: Vec<String>,
    pub multi: Vec<String>,
    /// Categorical columns with fewer than two categories, all-missing ones
    /// included. They are excluded from the matrix because a text column
    /// cannot be carried in an `f32` matrix unencoded.
    pub unusable: Vec<UnusableColumn>,
    /// Missing numeric cells passed through as `NaN`.
    pub missing_numeric: usize,
}

/// Output of [`build_features`].
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    /// Encoded features; columns are the canonical schema.
    pub matrix: FeatureMatrix,
    /// Target labels as `{0, 1}` when the target column was present.
    pub labels: Option<Vec<u8>>,
    /// The rules that produced `matrix`, for persisting next to the model.
    pub plan: EncodingPlan,
    /// Target value mapping when the target column was present.
    pub target_map: Option<BinaryMap>,
    pub report: BuildReport,
}

impl EncodedDataset {
    /// Canonical column list of the encoded matrix.
    pub fn schema(&self) -> Result<FeatureSchema, SchemaError> {
        FeatureSchema::new(self.matrix.columns().to_vec())
    }
}

/// Encode a cleaned training frame.
///
/// Numeric and boolean columns pass through; two-valued categorical columns
/// are mapped with [`BinaryMap::derive`]; columns with more categories are
/// one-hot encoded with the byte-wise first category dropped. Categorical
/// columns with fewer than two categories are reported and left out. The
/// target column never becomes a feature.
pub fn build_features(frame: &Frame, target_column: &str) -> Result<EncodedDataset, BuildError> {
    if frame.n_rows() == 0 {
        return Err(BuildError::EmptyDataset);
    }
    tracing::info!(
        columns = frame.n_columns(),
        rows = frame.n_rows(),
        "Starting feature engineering"
    );

    let mut report = BuildReport::default();
    let mut fields: Vec<FieldSpec> = Vec::new();
    let mut sources: Vec<&Column> = Vec::new();
    for column in frame.columns() {
        if column.name == target_column {
            continue;
        }
        let profile = profile_column(column);
        let rule = match profile.kind {
            ColumnKind::Numeric => {
                report.numeric.push(column.name.clone());
                FieldRule::Numeric
            }
            ColumnKind::Boolean => {
                report.boolean.push(column.name.clone());
                FieldRule::Boolean
            }
            ColumnKind::BinaryCategorical => match BinaryMap::derive(&profile.categories) {
                Some(map) => {
                    report.binary.push(column.name.clone());
                    FieldRule::Binary(map)
                }
                None => continue,
            },
            ColumnKind::MultiCategorical => {
                report.multi.push(column.name.clone());
                let categories: Vec<String> = profile.categories.into_iter().collect();
                let reference = categories.first().cloned();
                FieldRule::OneHot {
                    categories,
                    reference,
                }
            }
            ColumnKind::Unusable => {
                tracing::warn!(
                    column = %column.name,
                    distinct = profile.categories.len(),
                    "Categorical column has fewer than two categories; left out of features"
                );
                report.unusable.push(UnusableColumn {
                    name: column.name.clone(),
                    distinct: profile.categories.len(),
                });
                continue;
            }
        };
        fields.push(FieldSpec {
            name: column.name.clone(),
            rule,
        });
        sources.push(column);
    }
    if fields.is_empty() {
        return Err(BuildError::NoFeatures);
    }
    tracing::info!(
        numeric = report.numeric.len(),
        boolean = report.boolean.len(),
        binary = ?report.binary,
        multi = ?report.multi,
        "Classified feature columns"
    );

    let (labels, target_map) = match frame.column(target_column) {
        Some(column) => {
            let (labels, map) = encode_target(column)?;
            (Some(labels), Some(map))
        }
        None => (None, None),
    };

    let plan = EncodingPlan::new(
        labels.as_ref().map(|_| target_column.to_string()),
        fields,
    );
    let columns = plan.output_columns();
    let rows = encode_rows(frame.n_rows(), &plan, &sources, &mut report);
    let matrix = FeatureMatrix::from_rows(columns, &rows)?;
    tracing::info!(
        features = matrix.n_columns(),
        missing_numeric = report.missing_numeric,
        "Feature engineering complete"
    );

    Ok(EncodedDataset {
        matrix,
        labels,
        plan,
        target_map,
        report,
    })
}

fn encode_target(column: &Column) -> Result<(Vec<u8>, BinaryMap), BuildError> {
    let categories: BTreeSet<String> = column.values.iter().filter_map(category_label).collect();
    let map = BinaryMap::derive(&categories).ok_or_else(|| BuildError::TargetNotBinary {
        column: column.name.clone(),
        found: categories.iter().cloned().collect(),
    })?;
    let labels = column
        .values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            category_label(value)
                .and_then(|label| map.encode(&label))
                .ok_or_else(|| BuildError::MissingLabel {
                    column: column.name.clone(),
                    row,
                })
        })
        .collect::<Result<Vec<u8>, _>>()?;
    Ok((labels, map))
}

/// Fill rows in plan column order: pass-through fields first, then indicators.
fn encode_rows(
    n_rows: usize,
    plan: &EncodingPlan,
    sources: &[&Column],
    report: &mut BuildReport,
) -> Vec<Vec<f32>> {
    let pairs: Vec<(&FieldSpec, &Column)> = plan.fields.iter().zip(sources.iter().copied()).collect();
    let mut rows = Vec::with_capacity(n_rows);
    for row_idx in 0..n_rows {
        let mut row = Vec::new();
        for (spec, column) in pairs.iter().filter(|(spec, _)| spec.rule.is_pass_through()) {
            let value = &column.values[row_idx];
            let encoded = match &spec.rule {
                FieldRule::Numeric => value.to_f64().map(|v| v as f32).unwrap_or_else(|| {
                    report.missing_numeric += 1;
                    f32::NAN
                }),
                FieldRule::Boolean => value.to_f64().map(|v| v as f32).unwrap_or(0.0),
                FieldRule::Binary(map) => category_label(value)
                    .and_then(|label| map.encode(&label))
                    .map(f32::from)
                    .unwrap_or(0.0),
                FieldRule::OneHot { .. } => continue,
            };
            row.push(encoded);
        }
        for (spec, column) in &pairs {
            let FieldRule::OneHot {
                categories,
                reference,
            } = &spec.rule
            else {
                continue;
            };
            let label = category_label(&column.values[row_idx]);
            for category in categories.iter().filter(|c| Some(*c) != reference.as_ref()) {
                row.push(if label.as_ref() == Some(category) { 1.0 } else { 0.0 });
            }
        }
        rows.push(row);
    }
    rows
}
