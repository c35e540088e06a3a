//! Developer utility to evaluate a serving artifact against a labelled dataset.
//!
//! Rows go through the same transform as live requests, so the reported
//! accuracy includes any encoding drift between training and serving.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use churnguard::config::ChurnConfig;
use churnguard::dataset::load_jsonl;
use churnguard::features::{BinaryMap, category_label};
use churnguard::logging;
use churnguard::ml::metrics::BinaryConfusion;
use churnguard::serving::ServingContext;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: PathBuf,
    model_dir: Option<PathBuf>,
    runs_root: Option<PathBuf>,
    target: Option<String>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init_with_filter("error") {
        eprintln!("Logging disabled: {err}");
    }
    let mut config = ChurnConfig::load().map_err(|err| err.to_string())?;
    if let Some(dir) = options.model_dir {
        config.model_dir = dir;
    }
    if let Some(root) = options.runs_root {
        config.runs_root = root;
    }
    let target = options.target.unwrap_or(config.target_column.clone());
    let context = ServingContext::init(&config).map_err(|err| err.to_string())?;

    let frame = load_jsonl(&options.dataset).map_err(|err| err.to_string())?;
    let column = frame
        .column(&target)
        .ok_or_else(|| format!("Dataset has no {target} column"))?;
    let categories: BTreeSet<String> = column.values.iter().filter_map(category_label).collect();
    let target_map = BinaryMap::derive(&categories)
        .ok_or_else(|| format!("Target {target} is not binary: {categories:?}"))?;

    let mut truths = Vec::with_capacity(frame.n_rows());
    let mut records = Vec::with_capacity(frame.n_rows());
    for (value, record) in column.values.iter().zip(frame.records()) {
        let Some(truth) = category_label(value).and_then(|label| target_map.encode(&label)) else {
            continue;
        };
        truths.push(truth);
        records.push(record);
    }
    if records.is_empty() {
        return Err("No labelled rows to evaluate".to_string());
    }

    let predictions = context
        .predict_batch(&records)
        .map_err(|err| err.to_string())?;
    let cm = BinaryConfusion::from_pairs(
        truths
            .iter()
            .zip(&predictions)
            .map(|(&truth, prediction)| (truth, u8::from(prediction.verdict.is_likely()))),
    );
    let mut degraded_fields: BTreeMap<String, usize> = BTreeMap::new();
    for prediction in &predictions {
        for event in prediction.report.degradations.events() {
            *degraded_fields.entry(event.field().to_string()).or_default() += 1;
        }
    }

    println!("artifact: {}", context.artifact_dir().display());
    println!("rows: {}", cm.total());
    println!("accuracy: {:.4}", cm.accuracy());
    for (name, stats) in [
        (&target_map.zero, cm.negative()),
        (&target_map.one, cm.positive()),
    ] {
        println!(
            "class {:<8} precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            name, stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    println!("{:6}{:6}", cm.true_negative, cm.false_positive);
    println!("{:6}{:6}", cm.false_negative, cm.true_positive);
    if !degraded_fields.is_empty() {
        println!("defaulted values by field:");
        for (field, count) in &degraded_fields {
            println!("  {field}: {count}");
        }
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<PathBuf> = None;
    let mut model_dir: Option<PathBuf> = None;
    let mut runs_root: Option<PathBuf> = None;
    let mut target: Option<String> = None;

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
            "--model-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-dir requires a value".to_string())?;
                model_dir = Some(PathBuf::from(value));
            }
            "--runs-root" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--runs-root requires a value".to_string())?;
                runs_root = Some(PathBuf::from(value));
            }
            "--target" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--target requires a value".to_string())?;
                target = Some(value.clone());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dataset = dataset.ok_or_else(help_text)?;
    Ok(CliOptions {
        dataset,
        model_dir,
        runs_root,
        target,
    })
}

fn help_text() -> String {
    [
        "churn-eval",
        "",
        "Evaluates a serving artifact on a labelled dataset through the request transform.",
        "",
        "Usage:",
        "  churn-eval --dataset <file.jsonl> [--model-dir <dir>] [--runs-root <dir>] [--target <column>]",
        "",
        "Options:",
        "  --dataset <file>   Labelled dataset, one JSON object per row (required).",
        "  --model-dir <dir>  Artifact directory (default: config model_dir).",
        "  --runs-root <dir>  Experiment runs searched when the model directory is unusable.",
        "  --target <column>  Label column (default: config target_column).",
    ]
    .join("\n")
}
