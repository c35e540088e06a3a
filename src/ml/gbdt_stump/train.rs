use super::model::{GbdtStumpModel, Stump, sigmoid};

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of boosting rounds.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Feature column names; the width of every row.
    pub feature_columns: Vec<String>,
    /// Raw target values for class `0` and class `1`.
    pub classes: Vec<String>,
    /// Feature matrix, row-major. `NaN` marks a missing value.
    pub x: Vec<Vec<f32>>,
    /// Labels in `{0, 1}` aligned with `x`.
    pub y: Vec<u8>,
}

/// Train a binary stump-GBDT model with logistic-loss gradient boosting.
pub fn train_gbdt_stump(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<GbdtStumpModel, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    if dataset.classes.len() != 2 {
        return Err("Need exactly 2 classes".to_string());
    }
    let d = dataset.feature_columns.len();
    if d == 0 || d > u16::MAX as usize {
        return Err(format!("Unsupported feature count {d}"));
    }
    if let Some(idx) = dataset.x.iter().position(|row| row.len() != d) {
        return Err(format!("Row {idx} does not have {d} features"));
    }
    if dataset.y.iter().any(|&label| label > 1) {
        return Err("Labels must be 0 or 1".to_string());
    }

    let bins = options.bins.clamp(2, 256);
    let (mins, maxs) = compute_feature_min_max(&dataset.x, d);
    let binned = bin_features(&dataset.x, &mins, &maxs, bins);

    let init_raw = prior_log_odds(&dataset.y);
    let mut raw = vec![init_raw; dataset.x.len()];
    let mut stumps = Vec::with_capacity(options.rounds);
    for _round in 0..options.rounds {
        let residuals: Vec<f32> = dataset
            .y
            .iter()
            .zip(&raw)
            .map(|(&label, &r)| f32::from(label) - sigmoid(r))
            .collect();
        let stump = fit_best_stump(&binned, &dataset.x, &mins, &maxs, bins, &residuals);
        for (r, row) in raw.iter_mut().zip(&dataset.x) {
            *r += options.learning_rate * stump.predict(row);
        }
        stumps.push(stump);
    }

    Ok(GbdtStumpModel {
        model_version: 1,
        feature_columns: dataset.feature_columns.clone(),
        classes: dataset.classes.clone(),
        learning_rate: options.learning_rate,
        init_raw,
        stumps,
    })
}

fn prior_log_odds(y: &[u8]) -> f32 {
    let positives = y.iter().filter(|&&label| label == 1).count() as f32;
    let p = (positives / y.len().max(1) as f32).clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

fn compute_feature_min_max(x: &[Vec<f32>], feature_len: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mins = vec![f32::INFINITY; feature_len];
    let mut maxs = vec![f32::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            if v.is_finite() {
                mins[j] = mins[j].min(v);
                maxs[j] = maxs[j].max(v);
            }
        }
    }
    for j in 0..feature_len {
        if !mins[j].is_finite() || !maxs[j].is_finite() {
            mins[j] = 0.0;
            maxs[j] = 0.0;
        }
        if mins[j] == maxs[j] {
            maxs[j] = mins[j] + 1.0;
        }
    }
    (mins, maxs)
}

/// Quantize features into `bins` equal-width buckets.
///
/// Non-finite values land in the top bucket so split search sends them right,
/// matching [`Stump::predict`].
fn bin_features(x: &[Vec<f32>], mins: &[f32], maxs: &[f32], bins: usize) -> Vec<Vec<u8>> {
    let top = (bins - 1) as f32;
    x.iter()
        .map(|row| {
            mins.iter()
                .zip(maxs)
                .zip(row)
                .map(|((&min, &max), &v)| {
                    if !v.is_finite() {
                        return top as u8;
                    }
                    let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
                    (t * top).round() as u8
                })
                .collect()
        })
        .collect()
}

fn fit_best_stump(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    mins: &[f32],
    maxs: &[f32],
    bins: usize,
    residuals: &[f32],
) -> Stump {
    let mut best = BestSplit::default();
    for feature_idx in 0..mins.len() {
        let split = best_split_for_feature(binned, residuals, feature_idx, bins);
        if split.score < best.score {
            best = split;
        }
    }

    let feature_idx = best.feature_index;
    let threshold = threshold_for_bin(mins[feature_idx], maxs[feature_idx], best.split_bin, bins);
    let (left_value, right_value) = leaf_means_for_threshold(x, residuals, feature_idx, threshold);
    Stump {
        feature_index: feature_idx as u16,
        threshold,
        left_value,
        right_value,
    }
}

#[derive(Debug, Clone)]
struct BestSplit {
    score: f64,
    feature_index: usize,
    split_bin: usize,
}

impl Default for BestSplit {
    fn default() -> Self {
        Self {
            score: f64::INFINITY,
            feature_index: 0,
            split_bin: 0,
        }
    }
}

/// Lowest within-side squared error over all bin boundaries of one feature.
fn best_split_for_feature(
    binned: &[Vec<u8>],
    residuals: &[f32],
    feature_idx: usize,
    bins: usize,
) -> BestSplit {
    let mut counts = vec![0u32; bins];
    let mut sums = vec![0f64; bins];
    let mut sums_sq = vec![0f64; bins];
    for (row, &r) in binned.iter().zip(residuals) {
        let b = row[feature_idx] as usize;
        let r = r as f64;
        counts[b] += 1;
        sums[b] += r;
        sums_sq[b] += r * r;
    }
    let total_count: u32 = counts.iter().sum();
    let total_sum: f64 = sums.iter().sum();
    let total_sum_sq: f64 = sums_sq.iter().sum();

    let mut best = BestSplit {
        feature_index: feature_idx,
        ..BestSplit::default()
    };
    let (mut left_count, mut left_sum, mut left_sum_sq) = (0u32, 0f64, 0f64);
    for split_bin in 0..(bins - 1) {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        left_sum_sq += sums_sq[split_bin];
        let right_count = total_count - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - (left_sum * left_sum) / left_count as f64;
        let right_sse = right_sum_sq - (right_sum * right_sum) / right_count as f64;
        let score = left_sse + right_sse;
        if score < best.score {
            best.score = score;
            best.split_bin = split_bin;
        }
    }
    best
}

/// Upper edge of `split_bin`: the midpoint between its center and the next one.
fn threshold_for_bin(min: f32, max: f32, split_bin: usize, bins: usize) -> f32 {
    let step = (max - min) / (bins - 1) as f32;
    min + (split_bin as f32 + 0.5) * step
}

fn leaf_means_for_threshold(
    x: &[Vec<f32>],
    residuals: &[f32],
    feature_idx: usize,
    threshold: f32,
) -> (f32, f32) {
    let (mut left_sum, mut left_count) = (0.0f32, 0u32);
    let (mut right_sum, mut right_count) = (0.0f32, 0u32);
    for (row, &r) in x.iter().zip(residuals) {
        if row[feature_idx] <= threshold {
            left_sum += r;
            left_count += 1;
        } else {
            right_sum += r;
            right_count += 1;
        }
    }
    let mean = |sum: f32, count: u32| if count == 0 { 0.0 } else { sum / count as f32 };
    (mean(left_sum, left_count), mean(right_sum, right_count))
}
