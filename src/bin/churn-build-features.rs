//! Developer utility to encode a raw dataset and write its feature artifacts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use churnguard::config::ChurnConfig;
use churnguard::dataset::load_jsonl;
use churnguard::features::{
    ENCODING_PLAN_FILE_NAME, EncodedDataset, FEATURE_COLUMNS_FILE_NAME, build_features,
};
use churnguard::logging;
use churnguard::record::ID_COLUMN;

/// Encoded rows written next to the schema.
const ENCODED_FILE_NAME: &str = "encoded.jsonl";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: PathBuf,
    out_dir: PathBuf,
    target: Option<String>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init_with_filter("warn") {
        eprintln!("Logging disabled: {err}");
    }
    let config = ChurnConfig::load().map_err(|err| err.to_string())?;
    let target = options.target.unwrap_or(config.target_column);

    let frame = load_jsonl(&options.dataset).map_err(|err| err.to_string())?;
    let encoded =
        build_features(&frame.without_column(ID_COLUMN), &target).map_err(|err| err.to_string())?;
    let schema = encoded.schema().map_err(|err| err.to_string())?;

    std::fs::create_dir_all(&options.out_dir).map_err(|err| err.to_string())?;
    schema
        .save(&options.out_dir.join(FEATURE_COLUMNS_FILE_NAME))
        .map_err(|err| err.to_string())?;
    encoded
        .plan
        .save(&options.out_dir.join(ENCODING_PLAN_FILE_NAME))
        .map_err(|err| err.to_string())?;
    write_encoded(&options.out_dir.join(ENCODED_FILE_NAME), &encoded, &target)?;

    let report = &encoded.report;
    println!("rows: {}", encoded.matrix.n_rows());
    println!("feature columns: {}", schema.len());
    println!("numeric: {}", report.numeric.join(", "));
    println!("boolean: {}", report.boolean.join(", "));
    println!("binary: {}", report.binary.join(", "));
    println!("one-hot: {}", report.multi.join(", "));
    for column in &report.unusable {
        println!(
            "skipped {} ({} distinct value{})",
            column.name,
            column.distinct,
            if column.distinct == 1 { "" } else { "s" }
        );
    }
    if report.missing_numeric > 0 {
        println!("missing numeric cells: {}", report.missing_numeric);
    }
    println!("wrote {}", options.out_dir.display());
    Ok(())
}

/// One JSON object per row: feature columns in schema order, then the label.
fn write_encoded(path: &Path, encoded: &EncodedDataset, target: &str) -> Result<(), String> {
    let file = File::create(path).map_err(|err| format!("{}: {err}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (idx, row) in encoded.matrix.rows().enumerate() {
        let mut object = serde_json::Map::new();
        for (name, value) in encoded.matrix.columns().iter().zip(row.iter()) {
            object.insert(name.clone(), serde_json::json!(value));
        }
        if let Some(labels) = &encoded.labels {
            object.insert(target.to_string(), serde_json::json!(labels[idx]));
        }
        let line = serde_json::to_string(&object).map_err(|err| err.to_string())?;
        writeln!(out, "{line}").map_err(|err| err.to_string())?;
    }
    out.flush().map_err(|err| err.to_string())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from("features");
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
            "--out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = PathBuf::from(value);
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
        out_dir,
        target,
    })
}

fn help_text() -> String {
    [
        "churn-build-features",
        "",
        "Encodes a JSON-lines customer dataset and writes the feature schema and encoding plan.",
        "",
        "Usage:",
        "  churn-build-features --dataset <file.jsonl> [--out <dir>] [--target <column>]",
        "",
        "Options:",
        "  --dataset <file>   Cleaned dataset, one JSON object per row (required).",
        "  --out <dir>        Output directory (default: features).",
        "  --target <column>  Label column excluded from features (default: config target_column).",
    ]
    .join("\n")
}
