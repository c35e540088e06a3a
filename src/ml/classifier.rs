use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::gbdt_stump::GbdtStumpModel;
use crate::features::FeatureMatrix;

/// File name of the serialized model inside an artifact directory.
pub const MODEL_FILE_NAME: &str = "model.json";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid model: {0}")]
    Invalid(String),
    #[error("Model expects {expected} feature columns, got {found}")]
    FeatureCount { expected: usize, found: usize },
    #[error("Feature column {index} is {found}, model expects {expected}")]
    FeatureOrder {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("{0}")]
    Runtime(String),
}

/// Binary classifier over reconciled feature matrices.
///
/// Returns one scalar per matrix row; `1` is the positive class. The handle is
/// shared read-only across concurrent requests.
pub trait Classifier: Send + Sync {
    /// Column list the model was trained on, when the model records one.
    fn feature_columns(&self) -> Option<&[String]> {
        None
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f32>, ModelError>;
}

/// Check that `found` names exactly the `expected` columns in the same order.
pub fn check_feature_columns(expected: &[String], found: &[String]) -> Result<(), ModelError> {
    if found.len() != expected.len() {
        return Err(ModelError::FeatureCount {
            expected: expected.len(),
            found: found.len(),
        });
    }
    if let Some((index, (expected, found))) = expected
        .iter()
        .zip(found)
        .enumerate()
        .find(|(_, (expected, found))| expected != found)
    {
        return Err(ModelError::FeatureOrder {
            index,
            expected: expected.clone(),
            found: found.clone(),
        });
    }
    Ok(())
}

/// Shared, immutable model handle.
pub type ModelHandle = Arc<dyn Classifier>;

/// Load the model stored in an artifact directory.
pub fn load_model(dir: &Path) -> Result<ModelHandle, ModelError> {
    let model = GbdtStumpModel::load_json(&dir.join(MODEL_FILE_NAME))?;
    tracing::info!(
        dir = %dir.display(),
        stumps = model.stumps.len(),
        features = model.feature_columns.len(),
        "Model loaded"
    );
    Ok(Arc::new(model))
}
