//! Feature encoding shared by training and serving.
//!
//! The training-time [`build_features`] pass decides how every column is
//! encoded and records those decisions in an [`EncodingPlan`]. The plan's
//! ordered output columns become the canonical [`FeatureSchema`] that the
//! serving transform reconciles against.

mod binary;
mod builder;
mod kind;
mod matrix;
mod plan;
mod schema;

pub use binary::{BinaryMap, CANONICAL_BINARY_FIELDS};
pub use builder::{BuildError, BuildReport, EncodedDataset, UnusableColumn, build_features};
pub use kind::{ColumnKind, ColumnProfile, profile_column};
pub use matrix::{FeatureMatrix, MatrixError};
pub use plan::{
    ENCODING_PLAN_FILE_NAME, EncodingPlan, FieldRule, FieldSpec, NUMERIC_FIELDS, PlanError,
    one_hot_column,
};
pub use schema::{FEATURE_COLUMNS_FILE_NAME, FeatureSchema, ReconcileReport, SchemaError};

use crate::record::RawValue;

/// Category label of a raw value as seen by both encoding passes.
///
/// Labels are the value's text with surrounding whitespace removed; missing
/// values have no label.
pub fn category_label(value: &RawValue) -> Option<String> {
    value.category().map(|label| label.trim().to_string())
}
