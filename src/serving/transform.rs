use std::collections::HashSet;

use thiserror::Error;

use super::degradation::{Degradation, DegradationReport};
use crate::features::{
    EncodingPlan, FeatureMatrix, FeatureSchema, FieldRule, MatrixError, PlanError,
    ReconcileReport, category_label, one_hot_column,
};
use crate::record::{RawValue, Record};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(
        "Encoding plan does not match feature schema (schema only: {schema_only:?}, plan only: {plan_only:?})"
    )]
    PlanMismatch {
        schema_only: Vec<String>,
        plan_only: Vec<String>,
    },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// What happened to one record on its way to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    pub degradations: DegradationReport,
    pub reconcile: ReconcileReport,
}

/// Encodes raw request records into rows of the canonical schema.
#[derive(Debug, Clone)]
pub struct ServeTransform {
    plan: EncodingPlan,
    schema: FeatureSchema,
    planned: HashSet<String>,
    planned_columns: HashSet<String>,
    /// Fields without a rule are ignored instead of passed through.
    strict: bool,
}

impl ServeTransform {
    /// Transform driven by a plan saved next to the schema at training time.
    ///
    /// The plan's output columns must equal the schema exactly.
    pub fn new(plan: EncodingPlan, schema: FeatureSchema) -> Result<Self, TransformError> {
        plan.validate()?;
        let planned_columns = plan.output_columns();
        if planned_columns.as_slice() != schema.columns() {
            let schema_only = schema
                .columns()
                .iter()
                .filter(|c| !planned_columns.contains(c))
                .cloned()
                .collect();
            let plan_only = planned_columns
                .iter()
                .filter(|c| !schema.contains(c))
                .cloned()
                .collect();
            return Err(TransformError::PlanMismatch {
                schema_only,
                plan_only,
            });
        }
        Ok(Self::from_parts(plan, schema, true))
    }

    /// Transform for artifacts without a saved plan.
    ///
    /// Uses the fixed binary and numeric tables and recovers one-hot fields
    /// from the schema's column names. Other numeric fields pass through
    /// under their own name, but never into a column a rule owns.
    pub fn with_canonical_rules(schema: FeatureSchema) -> Self {
        let plan = EncodingPlan::canonical(&schema);
        Self::from_parts(plan, schema, false)
    }

    fn from_parts(plan: EncodingPlan, schema: FeatureSchema, strict: bool) -> Self {
        let planned = plan.fields.iter().map(|spec| spec.name.clone()).collect();
        let planned_columns = plan.output_columns().into_iter().collect();
        Self {
            plan,
            schema,
            planned,
            planned_columns,
            strict,
        }
    }

    pub fn plan(&self) -> &EncodingPlan {
        &self.plan
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode a record into sparse `(column, value)` pairs, before reconciliation.
    ///
    /// Also returns the request fields that were ignored because no rule
    /// covers them.
    fn encode(&self, record: &Record) -> (Vec<(String, f32)>, DegradationReport, Vec<String>) {
        let record = record.with_trimmed_names();
        let mut row = Vec::with_capacity(record.len());
        let mut report = DegradationReport::default();
        let mut ignored = Vec::new();

        for spec in &self.plan.fields {
            let value = record.get(&spec.name).filter(|v| !v.is_missing());
            encode_field(&spec.name, &spec.rule, value, &mut row, &mut report);
        }

        let target = self.plan.target_column.as_deref();
        for (name, value) in record.iter() {
            if self.planned.contains(name) || target == Some(name) {
                continue;
            }
            if self.strict {
                ignored.push(name.to_string());
                continue;
            }
            match encode_unplanned(name, value) {
                Some((column, _)) if self.planned_columns.contains(&column) => {
                    ignored.push(name.to_string());
                }
                Some(cell) => row.push(cell),
                None => {}
            }
        }
        (row, report, ignored)
    }

    /// Encode one record and lay it out in schema order.
    pub fn transform(&self, record: &Record) -> (Vec<f32>, TransformReport) {
        let (row, degradations, ignored) = self.encode(record);
        let (values, mut reconcile) = self.schema.reconcile_row(&row);
        reconcile.dropped.extend(ignored);
        if !reconcile.dropped.is_empty() {
            tracing::debug!(dropped = ?reconcile.dropped, "Columns outside schema dropped");
        }
        (
            values,
            TransformReport {
                degradations,
                reconcile,
            },
        )
    }

    /// Encode a batch; row `i` of the matrix belongs to `records[i]`.
    pub fn transform_batch(
        &self,
        records: &[Record],
    ) -> Result<(FeatureMatrix, Vec<TransformReport>), TransformError> {
        let mut rows = Vec::with_capacity(records.len());
        let mut reports = Vec::with_capacity(records.len());
        for record in records {
            let (values, report) = self.transform(record);
            rows.push(values);
            reports.push(report);
        }
        let matrix = FeatureMatrix::from_rows(self.schema.columns().to_vec(), &rows)?;
        Ok((matrix, reports))
    }
}

fn encode_field(
    name: &str,
    rule: &FieldRule,
    value: Option<&RawValue>,
    row: &mut Vec<(String, f32)>,
    report: &mut DegradationReport,
) {
    let Some(value) = value else {
        report.push(Degradation::MissingField {
            field: name.to_string(),
        });
        if rule.is_pass_through() {
            row.push((name.to_string(), 0.0));
        }
        return;
    };

    match rule {
        FieldRule::Numeric | FieldRule::Boolean => {
            let encoded = match value.to_f64() {
                Some(v) => v as f32,
                None => {
                    report.push(Degradation::NumericDefaulted {
                        field: name.to_string(),
                        raw: value.to_string(),
                    });
                    0.0
                }
            };
            row.push((name.to_string(), encoded));
        }
        FieldRule::Binary(map) => {
            let label = category_label(value).unwrap_or_default();
            let encoded = match map.encode(&label) {
                Some(bit) => f32::from(bit),
                None => {
                    report.push(Degradation::UnseenCategory {
                        field: name.to_string(),
                        value: label,
                    });
                    0.0
                }
            };
            row.push((name.to_string(), encoded));
        }
        FieldRule::OneHot {
            categories,
            reference,
        } => {
            let Some(label) = category_label(value) else {
                return;
            };
            if !categories.contains(&label) {
                let field = name.to_string();
                let value = label.clone();
                report.push(if reference.is_some() {
                    Degradation::UnseenCategory { field, value }
                } else {
                    Degradation::UnmatchedCategory { field, value }
                });
            }
            // The reference and unseen categories have no schema column; reconciliation drops them.
            row.push((one_hot_column(name, &label), 1.0));
        }
    }
}

/// Fields without a rule: numbers pass through, text becomes an indicator.
fn encode_unplanned(name: &str, value: &RawValue) -> Option<(String, f32)> {
    match value {
        RawValue::Missing => None,
        RawValue::Float(v) if v.is_nan() => None,
        RawValue::Bool(_) | RawValue::Int(_) | RawValue::Float(_) => {
            value.to_f64().map(|v| (name.to_string(), v as f32))
        }
        RawValue::Text(_) => category_label(value).map(|label| (one_hot_column(name, &label), 1.0)),
    }
}
