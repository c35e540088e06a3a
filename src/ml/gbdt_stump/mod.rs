//! Deterministic gradient-boosted decision-stump binary classifier.
//!
//! A small baseline without external ML dependencies:
//! - Logistic-loss boosting over single-split trees.
//! - Reproducible JSON export/load carrying the feature columns it was fit on.

mod model;
mod train;

pub use model::{GbdtStumpModel, Stump, sigmoid};
pub use train::{TrainDataset, TrainOptions, train_gbdt_stump};
