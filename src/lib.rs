//! Customer churn feature encoding, training and serving.
/// Application directory resolution.
pub mod app_dirs;
/// Runtime configuration.
pub mod config;
/// Tabular dataset loading and splitting.
pub mod dataset;
/// Feature encoding shared by training and serving.
pub mod features;
/// Logging setup.
pub mod logging;
/// Classifier trait, stump boosting and metrics.
pub mod ml;
/// Raw customer records.
pub mod record;
/// Request-time encoding and inference.
pub mod serving;
