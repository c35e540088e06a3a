//! Developer utility to train a churn classifier and write a serving artifact.

use std::path::PathBuf;

use churnguard::config::ChurnConfig;
use churnguard::dataset::{Frame, Split, load_jsonl, stratified_split};
use churnguard::features::{EncodedDataset, build_features, category_label};
use churnguard::logging;
use churnguard::ml::gbdt_stump::{GbdtStumpModel, TrainDataset, TrainOptions, train_gbdt_stump};
use churnguard::ml::metrics::BinaryConfusion;
use churnguard::record::ID_COLUMN;
use churnguard::serving::save_artifacts;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: PathBuf,
    out_dir: Option<PathBuf>,
    target: Option<String>,
    rounds: Option<usize>,
    learning_rate: Option<f32>,
    bins: Option<usize>,
    test_fraction: Option<f64>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init_with_filter("warn") {
        eprintln!("Logging disabled: {err}");
    }
    let config = ChurnConfig::load().map_err(|err| err.to_string())?;
    let target = options.target.clone().unwrap_or(config.target_column.clone());
    let out_dir = options.out_dir.clone().unwrap_or(config.model_dir.clone());
    let training = &config.training;
    let train_options = TrainOptions {
        rounds: options.rounds.unwrap_or(training.rounds),
        learning_rate: options.learning_rate.unwrap_or(training.learning_rate),
        bins: options.bins.unwrap_or(training.bins),
    };
    let test_fraction = options.test_fraction.unwrap_or(training.test_fraction);

    let frame = load_jsonl(&options.dataset).map_err(|err| err.to_string())?;
    let encoded =
        build_features(&frame.without_column(ID_COLUMN), &target).map_err(|err| err.to_string())?;
    let labels = encoded
        .labels
        .clone()
        .ok_or_else(|| format!("Dataset has no {target} column"))?;
    let keys = split_keys(&frame);
    let splits = stratified_split(&keys, &labels, &training.seed, test_fraction)?;
    let (train, test) = partition(&encoded, &labels, &splits)?;
    if train.x.is_empty() {
        return Err("Training split is empty".to_string());
    }

    let model = train_gbdt_stump(&train, &train_options)?;
    let schema = encoded.schema().map_err(|err| err.to_string())?;
    save_artifacts(&out_dir, &model, &encoded.plan, &schema).map_err(|err| err.to_string())?;

    println!(
        "trained on {} rows, {} features, {} rounds",
        train.x.len(),
        schema.len(),
        model.stumps.len()
    );
    if test.x.is_empty() {
        println!("test split is empty; skipping evaluation");
    } else {
        print_metrics(&model, &test);
    }
    println!("wrote {}", out_dir.display());
    Ok(())
}

fn split_keys(frame: &Frame) -> Vec<String> {
    match frame.column(ID_COLUMN) {
        Some(column) => column
            .values
            .iter()
            .enumerate()
            .map(|(idx, value)| category_label(value).unwrap_or_else(|| format!("row-{idx}")))
            .collect(),
        None => (0..frame.n_rows()).map(|idx| format!("row-{idx}")).collect(),
    }
}

fn partition(
    encoded: &EncodedDataset,
    labels: &[u8],
    splits: &[Split],
) -> Result<(TrainDataset, TrainDataset), String> {
    let target_map = encoded
        .target_map
        .as_ref()
        .ok_or_else(|| "Missing target mapping".to_string())?;
    let classes = vec![target_map.zero.clone(), target_map.one.clone()];
    let empty = || TrainDataset {
        feature_columns: encoded.matrix.columns().to_vec(),
        classes: classes.clone(),
        x: Vec::new(),
        y: Vec::new(),
    };
    let (mut train, mut test) = (empty(), empty());
    for ((row, &label), split) in encoded.matrix.rows().zip(labels).zip(splits) {
        let target = match split {
            Split::Train => &mut train,
            Split::Test => &mut test,
        };
        target.x.push(row.to_vec());
        target.y.push(label);
    }
    Ok((train, test))
}

fn print_metrics(model: &GbdtStumpModel, test: &TrainDataset) {
    let cm = BinaryConfusion::from_pairs(
        test.x
            .iter()
            .zip(&test.y)
            .map(|(row, &truth)| (truth, model.predict_label(row))),
    );
    println!("test accuracy: {:.4}", cm.accuracy());
    for (name, stats) in [
        (&model.classes[0], cm.negative()),
        (&model.classes[1], cm.positive()),
    ] {
        println!(
            "class {:<8} precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            name, stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    println!("{:6}{:6}", cm.true_negative, cm.false_positive);
    println!("{:6}{:6}", cm.false_negative, cm.true_positive);
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut target: Option<String> = None;
    let mut rounds: Option<usize> = None;
    let mut learning_rate: Option<f32> = None;
    let mut bins: Option<usize> = None;
    let mut test_fraction: Option<f64> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--target" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--target requires a value".to_string())?;
                target = Some(value.clone());
            }
            "--rounds" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--rounds requires a value".to_string())?;
                rounds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --rounds value: {value}"))?,
                );
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                learning_rate = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--bins" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--bins requires a value".to_string())?;
                bins = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --bins value: {value}"))?,
                );
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                test_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-fraction value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dataset = dataset.ok_or_else(help_text)?;
    Ok(CliOptions {
        dataset,
        out_dir,
        target,
        rounds,
        learning_rate,
        bins,
        test_fraction,
    })
}

fn help_text() -> String {
    [
        "churn-train",
        "",
        "Trains a gradient-boosted stump churn classifier and writes a serving artifact.",
        "",
        "Usage:",
        "  churn-train --dataset <file.jsonl> [--out <dir>] [options]",
        "",
        "Options:",
        "  --dataset <file>        Cleaned dataset, one JSON object per row (required).",
        "  --out <dir>             Artifact directory (default: config model_dir).",
        "  --target <column>       Label column (default: config target_column).",
        "  --rounds <n>            Boosting rounds (default: config, 100).",
        "  --learning-rate <f32>   Learning rate (default: config, 0.1).",
        "  --bins <n>              Feature bin count for split search (default: config, 32).",
        "  --test-fraction <f64>   Held-out fraction per class (default: config, 0.2).",
    ]
    .join("\n")
}
