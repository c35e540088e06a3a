//! Runtime configuration loaded from `config.toml` in the app root.
//!
//! Every key is optional; a missing file yields [`ChurnConfig::default`].
//! Binaries apply their command-line flags on top of the loaded values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// File name of the configuration inside the app root.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding [`ChurnConfig::model_dir`].
pub const MODEL_DIR_ENV: &str = "CHURNGUARD_MODEL_DIR";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The app root could not be resolved or created.
    #[error("Unable to resolve config directory: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but cannot be used.
    #[error("Invalid config value for {key}: {reason}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Top-level configuration shared by the serving and training binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    /// Primary model artifact directory.
    pub model_dir: PathBuf,
    /// Root of local experiment runs searched when `model_dir` is unusable.
    pub runs_root: PathBuf,
    /// Label column of training datasets.
    pub target_column: String,
    /// Training hyperparameters.
    pub training: TrainingConfig,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("/app/model"),
            runs_root: PathBuf::from("mlruns"),
            target_column: "Churn".to_string(),
            training: TrainingConfig::default(),
        }
    }
}

/// Hyperparameters and split settings for `churn-train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub rounds: usize,
    pub learning_rate: f32,
    pub bins: usize,
    /// Fraction of each class held out for evaluation.
    pub test_fraction: f64,
    /// Seed string mixed into the split hash.
    pub seed: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
            test_fraction: 0.2,
            seed: "churnguard-split-v1".to_string(),
        }
    }
}

impl ChurnConfig {
    /// Load `config.toml` from the app root and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        let mut config = Self::load_from(&path)?;
        if let Ok(dir) = std::env::var(MODEL_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.model_dir = PathBuf::from(dir.trim());
        }
        Ok(config)
    }

    /// Load configuration from an explicit path, returning defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "target_column",
                reason: "must not be empty".to_string(),
            });
        }
        let fraction = self.training.test_fraction;
        if !(0.0..1.0).contains(&fraction) {
            return Err(ConfigError::InvalidValue {
                key: "training.test_fraction",
                reason: format!("{fraction} is outside [0, 1)"),
            });
        }
        if self.training.rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "training.rounds",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ChurnConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ChurnConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "model_dir = \"/srv/churn\"\n[training]\nrounds = 7\n",
        )
        .unwrap();
        let config = ChurnConfig::load_from(&path).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/srv/churn"));
        assert_eq!(config.training.rounds, 7);
        assert_eq!(config.training.bins, 32);
        assert_eq!(config.target_column, "Churn");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "model_dir = [").unwrap();
        let err = ChurnConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[training]\ntest_fraction = 1.5\n").unwrap();
        let err = ChurnConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "training.test_fraction",
                ..
            }
        ));
    }

    #[test]
    fn load_reads_app_root_config() {
        let base = tempdir().unwrap();
        let _guard = app_dirs::OverrideGuard::set(base.path().to_path_buf());
        let path = config_path().unwrap();
        std::fs::write(&path, "target_column = \"Exited\"\n").unwrap();
        let config = ChurnConfig::load().unwrap();
        assert_eq!(config.target_column, "Exited");
    }
}
