//! Persisted per-field encoding rules.
//!
//! An [`EncodingPlan`] is written next to the model as `encoding.json`. It
//! pins every decision the training pass made (column kind, binary map,
//! one-hot categories and the dropped reference) so serving never re-derives
//! them from request data.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::binary::{BinaryMap, CANONICAL_BINARY_FIELDS};
use super::schema::FeatureSchema;
use crate::record::INPUT_FIELDS;

/// File name of the persisted plan inside an artifact directory.
pub const ENCODING_PLAN_FILE_NAME: &str = "encoding.json";

/// Numeric fields of the serving form.
pub const NUMERIC_FIELDS: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

const PLAN_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid encoding plan at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported encoding plan version {found} (expected {PLAN_VERSION})")]
    Version { found: u32 },
    #[error("Encoding plan lists field {0} more than once")]
    DuplicateField(String),
    #[error("One-hot field {field} has reference {reference} outside its categories")]
    BadReference { field: String, reference: String },
}

/// Encoding rule for a single input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// Coerced to a float; output column is the field name.
    Numeric,
    /// Boolean coerced to `{0, 1}`; output column is the field name.
    Boolean,
    /// Two-valued category mapped through a fixed map.
    Binary(BinaryMap),
    /// One indicator column per category except `reference`.
    OneHot {
        /// Known categories in byte-wise order.
        categories: Vec<String>,
        /// Dropped reference category, when known.
        #[serde(default)]
        reference: Option<String>,
    },
}

impl FieldRule {
    /// True for rules whose output column is the field name itself.
    pub fn is_pass_through(&self) -> bool {
        !matches!(self, Self::OneHot { .. })
    }
}

/// A field and its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// Ordered encoding rules for all model input fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingPlan {
    pub version: u32,
    /// Label column excluded from the features, if one was present.
    #[serde(default)]
    pub target_column: Option<String>,
    pub fields: Vec<FieldSpec>,
}

/// Name of the indicator column for `category` of `field`.
pub fn one_hot_column(field: &str, category: &str) -> String {
    format!("{field}_{category}")
}

impl EncodingPlan {
    pub fn new(target_column: Option<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            version: PLAN_VERSION,
            target_column,
            fields,
        }
    }

    /// Rule table used when an artifact carries no `encoding.json`.
    ///
    /// Binary and numeric fields come from the fixed serving tables. One-hot
    /// fields are recovered from the schema by matching `<field>_` prefixes
    /// against the known input fields; their reference category is unknown.
    pub fn canonical(schema: &FeatureSchema) -> Self {
        let mut fields: Vec<FieldSpec> = CANONICAL_BINARY_FIELDS
            .iter()
            .map(|(name, zero, one)| FieldSpec {
                name: (*name).to_string(),
                rule: FieldRule::Binary(BinaryMap::new(*zero, *one)),
            })
            .collect();
        fields.extend(NUMERIC_FIELDS.iter().map(|name| FieldSpec {
            name: (*name).to_string(),
            rule: FieldRule::Numeric,
        }));

        let claimed: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let mut one_hot: Vec<(&str, Vec<String>)> = INPUT_FIELDS
            .iter()
            .filter(|name| !claimed.contains(*name))
            .map(|name| (*name, Vec::new()))
            .collect();
        for column in schema.columns() {
            let owner = one_hot
                .iter_mut()
                .filter(|(field, _)| {
                    column.len() > field.len() + 1
                        && column.starts_with(*field)
                        && column.as_bytes()[field.len()] == b'_'
                })
                .max_by_key(|(field, _)| field.len());
            if let Some((field, categories)) = owner {
                categories.push(column[field.len() + 1..].to_string());
            }
        }
        for (field, mut categories) in one_hot {
            if categories.is_empty() {
                continue;
            }
            categories.sort();
            fields.push(FieldSpec {
                name: field.to_string(),
                rule: FieldRule::OneHot {
                    categories,
                    reference: None,
                },
            });
        }
        Self::new(None, fields)
    }

    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|spec| spec.name == field)
            .map(|spec| &spec.rule)
    }

    /// Output columns in model order.
    ///
    /// Pass-through fields keep their relative order and come first; indicator
    /// columns follow, grouped by field in plan order, each group in category
    /// order without the reference category.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .fields
            .iter()
            .filter(|spec| spec.rule.is_pass_through())
            .map(|spec| spec.name.clone())
            .collect();
        for spec in &self.fields {
            if let FieldRule::OneHot {
                categories,
                reference,
            } = &spec.rule
            {
                columns.extend(
                    categories
                        .iter()
                        .filter(|c| Some(*c) != reference.as_ref())
                        .map(|c| one_hot_column(&spec.name, c)),
                );
            }
        }
        columns
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.version != PLAN_VERSION {
            return Err(PlanError::Version {
                found: self.version,
            });
        }
        let mut seen = HashSet::new();
        for spec in &self.fields {
            if !seen.insert(spec.name.as_str()) {
                return Err(PlanError::DuplicateField(spec.name.clone()));
            }
            if let FieldRule::OneHot {
                categories,
                reference: Some(reference),
            } = &spec.rule
                && !categories.contains(reference)
            {
                return Err(PlanError::BadReference {
                    field: spec.name.clone(),
                    reference: reference.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let bytes = std::fs::read(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: Self = serde_json::from_slice(&bytes).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, bytes).map_err(|source| PlanError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
