use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::features::{
    ENCODING_PLAN_FILE_NAME, EncodingPlan, FEATURE_COLUMNS_FILE_NAME, FeatureSchema, PlanError,
    SchemaError,
};
use crate::ml::MODEL_FILE_NAME;
use crate::ml::gbdt_stump::GbdtStumpModel;

/// Location of the model directory inside one experiment run.
pub const RUN_ARTIFACT_SUBDIR: &str = "artifacts/model";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write model to {path}: {reason}")]
    WriteModel { path: PathBuf, reason: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("Refusing to save artifacts: {0}")]
    Inconsistent(String),
}

/// True when `dir` holds a serialized model.
pub fn is_artifact_dir(dir: &Path) -> bool {
    dir.join(MODEL_FILE_NAME).is_file()
}

/// Newest model directory under `<runs_root>/<experiment>/<run>/artifacts/model`.
///
/// Runs are ranked by the modification time of their model file; ties break
/// on the path so the choice is stable. Unreadable entries are skipped.
pub fn find_latest_run_artifact(runs_root: &Path) -> Option<PathBuf> {
    let experiments = fs::read_dir(runs_root).ok()?;
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for experiment in experiments.flatten() {
        let Ok(runs) = fs::read_dir(experiment.path()) else {
            continue;
        };
        for run in runs.flatten() {
            let candidate = run.path().join(RUN_ARTIFACT_SUBDIR);
            if !is_artifact_dir(&candidate) {
                continue;
            }
            let modified = fs::metadata(candidate.join(MODEL_FILE_NAME))
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let newer = match &best {
                None => true,
                Some((time, path)) => (modified, &candidate) > (*time, path),
            };
            if newer {
                best = Some((modified, candidate));
            }
        }
    }
    best.map(|(_, path)| path)
}

/// Write a complete artifact directory: model, canonical column list and plan.
///
/// The three must agree on the column list; nothing is written otherwise.
pub fn save_artifacts(
    dir: &Path,
    model: &GbdtStumpModel,
    plan: &EncodingPlan,
    schema: &FeatureSchema,
) -> Result<(), ArtifactError> {
    if model.feature_columns.as_slice() != schema.columns() {
        return Err(ArtifactError::Inconsistent(
            "model feature columns differ from the schema".to_string(),
        ));
    }
    if plan.output_columns().as_slice() != schema.columns() {
        return Err(ArtifactError::Inconsistent(
            "encoding plan output differs from the schema".to_string(),
        ));
    }
    fs::create_dir_all(dir).map_err(|source| ArtifactError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let model_path = dir.join(MODEL_FILE_NAME);
    model
        .save_json(&model_path)
        .map_err(|reason| ArtifactError::WriteModel {
            path: model_path,
            reason,
        })?;
    schema.save(&dir.join(FEATURE_COLUMNS_FILE_NAME))?;
    plan.save(&dir.join(ENCODING_PLAN_FILE_NAME))?;
    tracing::info!(dir = %dir.display(), columns = schema.len(), "Artifacts saved");
    Ok(())
}
