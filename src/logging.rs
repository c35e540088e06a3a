//! Logging setup shared by every binary.
//!
//! Installs a global tracing subscriber that writes to stderr and to a
//! per-launch log file. Stdout is left alone so the serving loop can emit
//! one JSON response per line there.
//!
//! The serving binary logs at `info`; the offline tools pass a quieter
//! default so their printed reports stay readable. `CHURNGUARD_LOG` takes
//! precedence over `RUST_LOG`, so serving verbosity can be raised without
//! touching other Rust processes in the same environment. Degradation events
//! are `warn`, per-request encoding detail is `debug`.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Maximum number of log files to retain.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "churnguard";
/// Filter directive variable checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "CHURNGUARD_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No platform-specific directory could be resolved for logs.
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    /// Failed to create the log file for this launch.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Initialize tracing with the default `info` filter.
///
/// Subsequent calls are no-ops. Callers are expected to degrade to plain
/// stderr output on failure rather than abort.
pub fn init() -> Result<(), LoggingError> {
    init_with_filter("info")
}

/// Initialize tracing, using `default_filter` when neither `CHURNGUARD_LOG`
/// nor `RUST_LOG` is set.
pub fn init_with_filter(default_filter: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = app_dirs::logs_dir().map_err(map_app_dir_error)?;
    let log_file_name = format_log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&log_file_name);
    ensure_file_exists(&log_path)?;

    let file_appender = rolling::never(&log_dir, log_file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    prune_old_logs(&log_dir, MAX_LOG_FILES)?;

    let timer = build_timer();
    let console_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter(default_filter))
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(log_file = %log_path.display(), "Logging initialized");
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| is_own_log_file(&entry.file_name().to_string_lossy()))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

/// Other tools may share the log directory; only our files are pruned.
fn is_own_log_file(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter(default_filter: &str) -> EnvFilter {
    let directive = filter_directive(
        std::env::var(LOG_FILTER_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        default_filter,
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("Ignoring invalid log filter {directive:?}: {err}");
        EnvFilter::new(default_filter)
    })
}

fn filter_directive(own: Option<String>, rust_log: Option<String>, default_filter: &str) -> String {
    [own, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default_filter.to_string())
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoDataDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn log_filename_has_timestamp_and_prefix() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = format_log_file_name(fixed).unwrap();
        assert_eq!(name, "churnguard_2023-11-14_22-13-20.log");
    }

    #[test]
    fn prune_keeps_newest_files() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            let path = dir.path().join(format!("churnguard_{idx}.log"));
            ensure_file_exists(&path).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        fs::write(dir.path().join("trainer.log"), "other tool").unwrap();

        prune_old_logs(dir.path(), 10).unwrap();
        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 12);
        assert!(remaining.contains(&"notes.txt".to_string()));
        assert!(remaining.contains(&"trainer.log".to_string()));
        assert!(!remaining.contains(&"churnguard_0.log".to_string()));
        assert!(!remaining.contains(&"churnguard_1.log".to_string()));
        assert!(remaining.contains(&"churnguard_11.log".to_string()));
    }

    #[test]
    fn crate_filter_wins_over_rust_log() {
        assert_eq!(
            filter_directive(Some("churnguard=debug".into()), Some("warn".into()), "info"),
            "churnguard=debug"
        );
        assert_eq!(filter_directive(None, Some(" warn ".into()), "info"), "warn");
        assert_eq!(filter_directive(Some("  ".into()), None, "warn"), "warn");
        assert_eq!(filter_directive(None, None, "info"), "info");
    }
}
