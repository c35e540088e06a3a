//! Request-time encoding and inference.
//!
//! [`ServingContext::init`] resolves the artifact directory, loads the
//! canonical schema, the encoding plan and the model exactly once, and fails
//! before any request is accepted if one of them is unusable. The resulting
//! context is immutable and safe to share across request handlers.

mod artifacts;
mod context;
mod degradation;
mod predict;
mod transform;

pub use artifacts::{
    ArtifactError, RUN_ARTIFACT_SUBDIR, find_latest_run_artifact, is_artifact_dir, save_artifacts,
};
pub use context::{InitError, ServingContext};
pub use degradation::{Degradation, DegradationReport};
pub use predict::{
    ChurnVerdict, LIKELY_TO_CHURN, NOT_LIKELY_TO_CHURN, PredictError, Prediction,
    PredictionResponse, infer,
};
pub use transform::{ServeTransform, TransformError, TransformReport};
