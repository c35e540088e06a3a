use std::path::{Path, PathBuf};

use thiserror::Error;

use super::artifacts::find_latest_run_artifact;
use super::predict::{PredictError, Prediction, PredictionResponse, infer};
use super::transform::{ServeTransform, TransformError};
use crate::config::ChurnConfig;
use crate::features::{
    ENCODING_PLAN_FILE_NAME, EncodingPlan, FEATURE_COLUMNS_FILE_NAME, FeatureSchema, PlanError,
    SchemaError,
};
use crate::ml::{ModelError, ModelHandle, check_feature_columns, load_model};
use crate::record::Record;

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Model in {dir} does not match its feature columns: {source}")]
    ColumnMismatch { dir: PathBuf, source: ModelError },
    #[error("No usable model at {primary} ({reason}) and no run artifacts under {runs_root}")]
    NoArtifacts {
        primary: PathBuf,
        runs_root: PathBuf,
        reason: Box<InitError>,
    },
}

/// Loaded model, schema and transform, shared read-only by all requests.
pub struct ServingContext {
    model: ModelHandle,
    transform: ServeTransform,
    artifact_dir: PathBuf,
}

impl ServingContext {
    /// Load artifacts from the configured model directory.
    ///
    /// When that directory cannot be loaded, the newest run under
    /// `runs_root` is used instead. Fails when neither yields a model.
    pub fn init(config: &ChurnConfig) -> Result<Self, InitError> {
        let primary_err = match Self::from_dir(&config.model_dir) {
            Ok(context) => return Ok(context),
            Err(err) => err,
        };
        tracing::warn!(
            dir = %config.model_dir.display(),
            error = %primary_err,
            "Model directory unusable, searching run artifacts"
        );
        let Some(fallback) = find_latest_run_artifact(&config.runs_root) else {
            return Err(InitError::NoArtifacts {
                primary: config.model_dir.clone(),
                runs_root: config.runs_root.clone(),
                reason: Box::new(primary_err),
            });
        };
        tracing::info!(dir = %fallback.display(), "Using latest run artifact");
        Self::from_dir(&fallback)
    }

    /// Load a single artifact directory without any fallback.
    pub fn from_dir(dir: &Path) -> Result<Self, InitError> {
        let model = load_model(dir)?;
        let schema = FeatureSchema::load(&dir.join(FEATURE_COLUMNS_FILE_NAME))?;
        if let Some(columns) = model.feature_columns() {
            check_feature_columns(columns, schema.columns()).map_err(|source| {
                InitError::ColumnMismatch {
                    dir: dir.to_path_buf(),
                    source,
                }
            })?;
        }
        let plan_path = dir.join(ENCODING_PLAN_FILE_NAME);
        let transform = if plan_path.is_file() {
            ServeTransform::new(EncodingPlan::load(&plan_path)?, schema)?
        } else {
            tracing::warn!(
                dir = %dir.display(),
                "No encoding plan in artifact, using canonical encoding rules"
            );
            ServeTransform::with_canonical_rules(schema)
        };
        tracing::info!(
            dir = %dir.display(),
            columns = transform.schema().len(),
            "Serving context ready"
        );
        Ok(Self::new(model, transform, dir))
    }

    pub fn new(model: ModelHandle, transform: ServeTransform, artifact_dir: &Path) -> Self {
        Self {
            model,
            transform,
            artifact_dir: artifact_dir.to_path_buf(),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.transform.schema()
    }

    pub fn transform(&self) -> &ServeTransform {
        &self.transform
    }

    /// Encode one record, run the model and map the output to a verdict.
    pub fn predict(&self, record: &Record) -> Result<Prediction, PredictError> {
        let mut predictions = self.predict_batch(std::slice::from_ref(record))?;
        predictions.pop().ok_or(PredictError::OutputCount {
            expected: 1,
            returned: 0,
        })
    }

    /// Predict several records with a single model call.
    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<Prediction>, PredictError> {
        let (matrix, reports) = self.transform.transform_batch(records)?;
        for report in &reports {
            report.degradations.log();
        }
        let verdicts = infer(self.model.as_ref(), &matrix)?;
        Ok(verdicts
            .into_iter()
            .zip(reports)
            .map(|(verdict, report)| Prediction { verdict, report })
            .collect())
    }

    /// Request-handler entry point: never fails, errors become `{"error": ...}`.
    pub fn respond(&self, record: &Record) -> PredictionResponse {
        let result = self.predict(record);
        if let Err(err) = &result {
            tracing::error!(error = %err, "Prediction failed");
        }
        PredictionResponse::from_result(&result)
    }
}
