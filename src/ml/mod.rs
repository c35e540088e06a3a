//! Classifier capability and the bundled reference model.
//!
//! Serving only depends on [`Classifier`]; the stump ensemble is one
//! implementation of it that can be trained and persisted from this crate.

mod classifier;
pub mod gbdt_stump;
pub mod metrics;

pub use classifier::{
    Classifier, MODEL_FILE_NAME, ModelError, ModelHandle, check_feature_columns, load_model,
};
