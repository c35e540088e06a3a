use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::features::FeatureMatrix;
use crate::ml::{Classifier, ModelError, check_feature_columns};

/// Single-node decision tree used as a weak learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Threshold in feature units.
    pub threshold: f32,
    /// Prediction for `feature <= threshold`.
    pub left_value: f32,
    /// Prediction for `feature > threshold` and for `NaN`.
    pub right_value: f32,
}

impl Stump {
    pub fn predict(&self, features: &[f32]) -> f32 {
        let value = features
            .get(self.feature_index as usize)
            .copied()
            .unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Boosted stump ensemble with a logistic link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtStumpModel {
    /// Model format version.
    pub model_version: i64,
    /// Feature columns, in the order the model reads them.
    pub feature_columns: Vec<String>,
    /// Raw target values for class `0` and class `1`.
    pub classes: Vec<String>,
    /// Learning rate applied to each stump prediction.
    pub learning_rate: f32,
    /// Log-odds before any boosting round.
    pub init_raw: f32,
    pub stumps: Vec<Stump>,
}

impl GbdtStumpModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "Model must have exactly 2 classes, found {}",
                self.classes.len()
            ));
        }
        if self.feature_columns.is_empty() {
            return Err("Model lists no feature columns".to_string());
        }
        for (idx, stump) in self.stumps.iter().enumerate() {
            if stump.feature_index as usize >= self.feature_columns.len() {
                return Err(format!(
                    "Stump {idx} reads feature {} but the model has {} features",
                    stump.feature_index,
                    self.feature_columns.len()
                ));
            }
        }
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate().map_err(ModelError::Invalid)?;
        Ok(model)
    }

    /// Write the model as pretty JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        let bytes = serde_json::to_vec_pretty(self).map_err(|err| err.to_string())?;
        std::fs::write(path, bytes).map_err(|err| err.to_string())
    }

    pub fn predict_raw(&self, features: &[f32]) -> f32 {
        self.stumps.iter().fold(self.init_raw, |raw, stump| {
            raw + self.learning_rate * stump.predict(features)
        })
    }

    /// Probability of class `1`.
    pub fn predict_proba(&self, features: &[f32]) -> f32 {
        sigmoid(self.predict_raw(features))
    }

    /// Hard label: `1` when the class-1 probability is at least one half.
    pub fn predict_label(&self, features: &[f32]) -> u8 {
        u8::from(self.predict_proba(features) >= 0.5)
    }
}

impl Classifier for GbdtStumpModel {
    fn feature_columns(&self) -> Option<&[String]> {
        Some(&self.feature_columns)
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f32>, ModelError> {
        check_feature_columns(&self.feature_columns, features.columns())?;
        Ok(features
            .rows()
            .map(|row| f32::from(self.predict_label(&row.to_vec())))
            .collect())
    }
}

/// Numerically-stable logistic function.
pub fn sigmoid(raw: f32) -> f32 {
    if raw >= 0.0 {
        1.0 / (1.0 + (-raw).exp())
    } else {
        let e = raw.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn model() -> GbdtStumpModel {
        GbdtStumpModel {
            model_version: 1,
            feature_columns: vec!["tenure".into(), "Contract_Two year".into()],
            classes: vec!["No".into(), "Yes".into()],
            learning_rate: 1.0,
            init_raw: 0.0,
            stumps: vec![Stump {
                feature_index: 0,
                threshold: 12.0,
                left_value: 2.0,
                right_value: -2.0,
            }],
        }
    }

    #[test]
    fn stump_predict_branches() {
        let stump = Stump {
            feature_index: 0,
            threshold: 0.5,
            left_value: -1.0,
            right_value: 2.0,
        };
        assert_eq!(stump.predict(&[0.0]), -1.0);
        assert_eq!(stump.predict(&[0.5]), -1.0);
        assert_eq!(stump.predict(&[0.6]), 2.0);
        assert_eq!(stump.predict(&[f32::NAN]), 2.0);
    }

    #[test]
    fn short_tenure_predicts_positive() {
        let model = model();
        assert_eq!(model.predict_label(&[3.0, 0.0]), 1);
        assert_eq!(model.predict_label(&[40.0, 1.0]), 0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn classifier_rejects_misordered_columns() {
        let model = model();
        let matrix = FeatureMatrix::from_rows(
            vec!["Contract_Two year".into(), "tenure".into()],
            &[vec![0.0, 3.0]],
        )
        .unwrap();
        let err = model.predict(&matrix).unwrap_err();
        assert!(matches!(err, ModelError::FeatureOrder { index: 0, .. }));
    }

    #[test]
    fn classifier_returns_one_label_per_row() {
        let model = model();
        let matrix = FeatureMatrix::from_rows(
            model.feature_columns.clone(),
            &[vec![3.0, 0.0], vec![40.0, 1.0]],
        )
        .unwrap();
        assert_eq!(model.predict(&matrix).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn json_round_trip_validates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let model = model();
        model.save_json(&path).unwrap();
        assert_eq!(GbdtStumpModel::load_json(&path).unwrap(), model);

        let mut broken = model.clone();
        broken.stumps[0].feature_index = 9;
        broken.save_json(&path).unwrap();
        assert!(matches!(
            GbdtStumpModel::load_json(&path),
            Err(ModelError::Invalid(_))
        ));
    }
}
