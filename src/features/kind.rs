use std::collections::BTreeSet;

use super::category_label;
use crate::dataset::Column;
use crate::record::RawValue;

/// How a training column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every present value is a number; passed through unchanged.
    Numeric,
    /// Every present value is a boolean; coerced to `{0, 1}`.
    Boolean,
    /// Exactly two distinct categories.
    BinaryCategorical,
    /// More than two distinct categories.
    MultiCategorical,
    /// Categorical with fewer than two distinct categories (including all-missing).
    Unusable,
}

/// Kind of a column plus the distinct categories it showed.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub kind: ColumnKind,
    /// Distinct category labels in byte-wise order; empty for numeric and boolean columns.
    pub categories: BTreeSet<String>,
}

/// Inspect a training column. Missing values are ignored when counting categories.
pub fn profile_column(column: &Column) -> ColumnProfile {
    let present: Vec<&RawValue> = column.values.iter().filter(|v| !v.is_missing()).collect();
    if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        return ColumnProfile {
            kind: ColumnKind::Numeric,
            categories: BTreeSet::new(),
        };
    }
    if !present.is_empty() && present.iter().all(|v| matches!(v, RawValue::Bool(_))) {
        return ColumnProfile {
            kind: ColumnKind::Boolean,
            categories: BTreeSet::new(),
        };
    }
    let categories: BTreeSet<String> = present.into_iter().filter_map(category_label).collect();
    let kind = match categories.len() {
        2 => ColumnKind::BinaryCategorical,
        n if n > 2 => ColumnKind::MultiCategorical,
        _ => ColumnKind::Unusable,
    };
    ColumnProfile { kind, categories }
}
