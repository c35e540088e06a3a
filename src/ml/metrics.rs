//! Evaluation metrics for the binary churn classifier.

use serde::Serialize;

/// 2x2 confusion counts with class `1` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BinaryConfusion {
    pub true_positive: u32,
    pub false_positive: u32,
    pub true_negative: u32,
    pub false_negative: u32,
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    pub f1: f32,
    /// Number of true examples of the class.
    pub support: u32,
}

impl BinaryConfusion {
    pub fn add(&mut self, truth: u8, predicted: u8) {
        let slot = match (truth == 1, predicted == 1) {
            (true, true) => &mut self.true_positive,
            (false, true) => &mut self.false_positive,
            (false, false) => &mut self.true_negative,
            (true, false) => &mut self.false_negative,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u8, u8)>) -> Self {
        let mut cm = Self::default();
        for (truth, predicted) in pairs {
            cm.add(truth, predicted);
        }
        cm
    }

    pub fn total(&self) -> u32 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f32 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// Stats for class `1` (churners).
    pub fn positive(&self) -> ClassStats {
        class_stats(self.true_positive, self.false_positive, self.false_negative)
    }

    /// Stats for class `0`, treating it as the class of interest.
    pub fn negative(&self) -> ClassStats {
        class_stats(self.true_negative, self.false_negative, self.false_positive)
    }
}

fn class_stats(tp: u32, fp: u32, fn_: u32) -> ClassStats {
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassStats {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

fn ratio(num: u32, den: u32) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}
