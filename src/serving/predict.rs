use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Serialize, Serializer};
use thiserror::Error;

use super::transform::{TransformError, TransformReport};
use crate::features::FeatureMatrix;
use crate::ml::{Classifier, ModelError};

pub const LIKELY_TO_CHURN: &str = "Likely to churn";
pub const NOT_LIKELY_TO_CHURN: &str = "Not likely to churn";

/// Human-readable outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChurnVerdict {
    Likely,
    NotLikely,
}

impl ChurnVerdict {
    /// Only an output of exactly `1` is the positive class. Anything else,
    /// including `NaN`, maps to [`ChurnVerdict::NotLikely`].
    pub fn from_model_output(output: f32) -> Self {
        if output == 1.0 {
            Self::Likely
        } else {
            Self::NotLikely
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Likely => LIKELY_TO_CHURN,
            Self::NotLikely => NOT_LIKELY_TO_CHURN,
        }
    }

    pub fn is_likely(self) -> bool {
        self == Self::Likely
    }
}

impl fmt::Display for ChurnVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChurnVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model prediction failed: {0}")]
    ModelFailed(#[from] ModelError),
    #[error("Model prediction failed: model panicked: {0}")]
    ModelPanicked(String),
    #[error("Model prediction failed: expected {expected} outputs, got {returned}")]
    OutputCount { expected: usize, returned: usize },
    #[error("Failed to encode request: {0}")]
    Transform(#[from] TransformError),
}

/// A verdict together with what the transform had to repair to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub verdict: ChurnVerdict,
    pub report: TransformReport,
}

/// JSON body returned to callers: `{"prediction": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Prediction { prediction: ChurnVerdict },
    Error { error: String },
}

impl PredictionResponse {
    pub fn from_result(result: &Result<Prediction, PredictError>) -> Self {
        match result {
            Ok(prediction) => Self::Prediction {
                prediction: prediction.verdict,
            },
            Err(err) => Self::Error {
                error: err.to_string(),
            },
        }
    }
}

/// Run the model over a reconciled matrix and map each output to a verdict.
///
/// Model errors and panics are both reported as [`PredictError`] so a single
/// bad request never takes the service down.
pub fn infer(
    model: &dyn Classifier,
    features: &FeatureMatrix,
) -> Result<Vec<ChurnVerdict>, PredictError> {
    let outputs = panic::catch_unwind(AssertUnwindSafe(|| model.predict(features)))
        .map_err(|payload| PredictError::ModelPanicked(panic_message(payload.as_ref())))??;
    if outputs.len() != features.n_rows() {
        return Err(PredictError::OutputCount {
            expected: features.n_rows(),
            returned: outputs.len(),
        });
    }
    Ok(outputs
        .into_iter()
        .map(ChurnVerdict::from_model_output)
        .collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
