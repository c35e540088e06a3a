//! Churn prediction service.
//!
//! Reads one JSON customer record per line and writes one JSON response per
//! line: `{"prediction": "..."}` or `{"error": "..."}`. Logs go to stderr and
//! the log directory so stdout carries responses only.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use churnguard::config::ChurnConfig;
use churnguard::logging;
use churnguard::record::Record;
use churnguard::serving::{PredictionResponse, ServingContext};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    model_dir: Option<PathBuf>,
    runs_root: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let mut config = ChurnConfig::load().map_err(|err| err.to_string())?;
    if let Some(dir) = options.model_dir {
        config.model_dir = dir;
    }
    if let Some(root) = options.runs_root {
        config.runs_root = root;
    }
    let context = ServingContext::init(&config).map_err(|err| err.to_string())?;
    tracing::info!(dir = %context.artifact_dir().display(), "Accepting requests");

    let reader: Box<dyn BufRead> = match &options.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|err| format!("Failed to open {}: {err}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut served = 0usize;
    for line in reader.lines() {
        let line = line.map_err(|err| format!("Failed to read request: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Record>(&line) {
            Ok(record) => context.respond(&record),
            Err(err) => {
                tracing::warn!(error = %err, "Rejected malformed request");
                PredictionResponse::Error {
                    error: format!("Invalid request: {err}"),
                }
            }
        };
        let body = serde_json::to_string(&response).map_err(|err| err.to_string())?;
        writeln!(out, "{body}").map_err(|err| err.to_string())?;
        out.flush().map_err(|err| err.to_string())?;
        served += 1;
    }
    tracing::info!(served, "Input closed, shutting down");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-dir requires a value".to_string())?;
                options.model_dir = Some(PathBuf::from(value));
            }
            "--runs-root" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--runs-root requires a value".to_string())?;
                options.runs_root = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--input requires a value".to_string())?;
                options.input = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "churnguard",
        "",
        "Serves churn predictions for JSON customer records, one per line.",
        "",
        "Usage:",
        "  churnguard [--model-dir <dir>] [--runs-root <dir>] [--input <file>]",
        "",
        "Options:",
        "  --model-dir <dir>  Artifact directory (default: config model_dir or CHURNGUARD_MODEL_DIR).",
        "  --runs-root <dir>  Experiment runs searched when the model directory is unusable.",
        "  --input <file>     Read requests from a file instead of stdin.",
    ]
    .join("\n")
}
