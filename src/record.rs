//! Raw customer records as they arrive from callers and datasets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Names of the 18 input fields accepted by the serving endpoint, in form order.
pub const INPUT_FIELDS: [&str; 18] = [
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "tenure",
    "MonthlyCharges",
    "TotalCharges",
];

/// Customer identifier column; a split key, never a feature.
pub const ID_COLUMN: &str = "customerID";

/// A single untyped cell value.
///
/// Deserializes from plain JSON scalars: `null`, booleans, integers, floats
/// and strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// True for values that are numbers in their own right (not parsed text).
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Coerce to a float the way a lenient numeric parser would.
    ///
    /// Text is trimmed and parsed; booleans map to 0/1. Returns `None` for
    /// missing or unparsable values.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Missing => None,
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) if v.is_nan() => None,
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Render the value as a category label. Missing values have no label.
    pub fn category(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One customer observation: field name to raw value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, RawValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, field: &str, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<RawValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Copy of the record with surrounding whitespace stripped from field names.
    ///
    /// When two names collide after trimming, the later one in key order wins.
    pub fn with_trimmed_names(&self) -> Self {
        self.fields
            .iter()
            .map(|(name, value)| (name.trim().to_string(), value.clone()))
            .collect()
    }
}

impl FromIterator<(String, RawValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, RawValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Typed request payload with the 18 fields the serving form collects.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub gender: String,
    pub Partner: String,
    pub Dependents: String,
    pub PhoneService: String,
    pub MultipleLines: String,
    pub InternetService: String,
    pub OnlineSecurity: String,
    pub OnlineBackup: String,
    pub DeviceProtection: String,
    pub TechSupport: String,
    pub StreamingTV: String,
    pub StreamingMovies: String,
    pub Contract: String,
    pub PaperlessBilling: String,
    pub PaymentMethod: String,
    pub tenure: i64,
    pub MonthlyCharges: f64,
    pub TotalCharges: f64,
}

impl From<CustomerRecord> for Record {
    fn from(c: CustomerRecord) -> Self {
        Record::new()
            .with("gender", c.gender)
            .with("Partner", c.Partner)
            .with("Dependents", c.Dependents)
            .with("PhoneService", c.PhoneService)
            .with("MultipleLines", c.MultipleLines)
            .with("InternetService", c.InternetService)
            .with("OnlineSecurity", c.OnlineSecurity)
            .with("OnlineBackup", c.OnlineBackup)
            .with("DeviceProtection", c.DeviceProtection)
            .with("TechSupport", c.TechSupport)
            .with("StreamingTV", c.StreamingTV)
            .with("StreamingMovies", c.StreamingMovies)
            .with("Contract", c.Contract)
            .with("PaperlessBilling", c.PaperlessBilling)
            .with("PaymentMethod", c.PaymentMethod)
            .with("tenure", c.tenure)
            .with("MonthlyCharges", c.MonthlyCharges)
            .with("TotalCharges", c.TotalCharges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_deserialize_from_json_scalars() {
        let record: Record = serde_json::from_str(
            r#"{"a": null, "b": true, "c": 5, "d": 70.35, "e": "Yes"}"#,
        )
        .unwrap();
        assert_eq!(record.get("a"), Some(&RawValue::Missing));
        assert_eq!(record.get("b"), Some(&RawValue::Bool(true)));
        assert_eq!(record.get("c"), Some(&RawValue::Int(5)));
        assert_eq!(record.get("d"), Some(&RawValue::Float(70.35)));
        assert_eq!(record.get("e"), Some(&RawValue::Text("Yes".into())));
    }

    #[test]
    fn numeric_coercion_is_lenient() {
        assert_eq!(RawValue::from(" 29.85 ").to_f64(), Some(29.85));
        assert_eq!(RawValue::from("").to_f64(), None);
        assert_eq!(RawValue::from("n/a").to_f64(), None);
        assert_eq!(RawValue::Float(f64::NAN).to_f64(), None);
        assert_eq!(RawValue::Int(3).to_f64(), Some(3.0));
    }

    #[test]
    fn trimming_names_keeps_values() {
        let record = Record::new().with(" tenure ", 5).with("gender", "Male");
        let trimmed = record.with_trimmed_names();
        assert_eq!(trimmed.get("tenure"), Some(&RawValue::Int(5)));
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn customer_record_converts_to_all_input_fields() {
        let json = r#"{
            "gender": "Female", "Partner": "Yes", "Dependents": "No",
            "PhoneService": "Yes", "MultipleLines": "No",
            "InternetService": "Fiber optic", "OnlineSecurity": "No",
            "OnlineBackup": "No", "DeviceProtection": "No", "TechSupport": "No",
            "StreamingTV": "No", "StreamingMovies": "No",
            "Contract": "Month-to-month", "PaperlessBilling": "Yes",
            "PaymentMethod": "Electronic check", "tenure": 5,
            "MonthlyCharges": 70.35, "TotalCharges": 350.0
        }"#;
        let customer: CustomerRecord = serde_json::from_str(json).unwrap();
        let record = Record::from(customer);
        for field in INPUT_FIELDS {
            assert!(record.get(field).is_some(), "missing {field}");
        }
        assert_eq!(record.get("tenure"), Some(&RawValue::Int(5)));
    }
}
