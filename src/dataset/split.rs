//! Deterministic, stratified train/test assignment.

use std::collections::BTreeMap;

/// Dataset partition a row is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// Assign each row to train or test, stratified by `classes`.
///
/// Rows are ordered within their class by `blake3(seed|class|key)` and the
/// first `round(n * test_fraction)` go to test. The result only depends on
/// the seed and on each row's key, never on input order. Singleton classes
/// stay entirely in train.
pub fn stratified_split(
    keys: &[String],
    classes: &[u8],
    seed: &str,
    test_fraction: f64,
) -> Result<Vec<Split>, String> {
    if keys.len() != classes.len() {
        return Err("Mismatched key/class lengths".to_string());
    }
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(format!("Invalid test fraction {test_fraction}"));
    }
    let mut by_class: BTreeMap<u8, Vec<(u128, usize)>> = BTreeMap::new();
    for (idx, (key, &class)) in keys.iter().zip(classes).enumerate() {
        let hash = blake3::hash(format!("{seed}|{class}|{key}").as_bytes());
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&hash.as_bytes()[..16]);
        by_class
            .entry(class)
            .or_default()
            .push((u128::from_le_bytes(prefix), idx));
    }

    let mut splits = vec![Split::Train; keys.len()];
    for (_class, mut entries) in by_class {
        entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        let n = entries.len();
        let mut test_n = ((n as f64) * test_fraction).round() as usize;
        if n <= 1 {
            test_n = 0;
        } else if test_n >= n {
            test_n = n - 1;
        }
        for (_hash, idx) in entries.into_iter().take(test_n) {
            splits[idx] = Split::Test;
        }
    }
    Ok(splits)
}
