use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::UtcOffset;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, fmt, prelude::*};

const LOG_RETENTION_DAYS: u64 = 7;

/// Log directory in the user cache directory
/// - Linux: ~/.cache/p4ir/
/// - macOS: ~/Library/Caches/p4ir/
/// - Windows: %LOCALAPPDATA%\p4ir\
fn get_log_dir() -> io::Result<PathBuf> {
    let mut log_dir = dirs::cache_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Unable to determine user cache directory"))?;
    log_dir.push("p4ir");
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }
    Ok(log_dir)
}

/// Removes run logs older than LOG_RETENTION_DAYS.
fn cleanup_old_logs(log_dir: &Path) {
    let now = std::time::SystemTime::now();
    let retention = std::time::Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let is_run_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("run-") && name.ends_with(".log"));
        if !is_run_log {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            if let Err(e) = fs::remove_file(entry.path()) {
                eprintln!("Failed to remove old log file {:?}: {}", entry.path(), e);
            }
        }
    }
}

fn already_initialized(e: &dyn std::error::Error) -> bool {
    let message = e.to_string();
    message.contains("already been set") || message.contains("SetLoggerError")
}

/// Initializes stderr logging and, when `log_file` is set, a per-run DEBUG
/// log file in the cache directory.
///
/// The stderr level is `log_level` when given, otherwise `RUST_LOG`, otherwise
/// `info`. The returned guard flushes the file writer and must be kept alive
/// for the duration of the program.
pub fn init_logger(no_color: bool, log_level: Option<&str>, log_file: bool) -> io::Result<Option<WorkerGuard>> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!("[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"),
    );

    let stderr_filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter);

    if !log_file {
        return match tracing_subscriber::registry().with(stderr_layer).try_init() {
            Ok(()) => Ok(None),
            Err(e) if already_initialized(&e) => Ok(None),
            Err(e) => Err(io::Error::other(e)),
        };
    }

    let log_dir = get_log_dir()?;
    cleanup_old_logs(&log_dir);

    let timestamp = time::OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .map_err(io::Error::other)?;
    let log_path = log_dir.join(format!("run-{}-{}.log", timestamp, std::process::id()));
    let file = fs::OpenOptions::new().create(true).append(true).open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(timer)
        .with_ansi(false)
        .with_filter(tracing_subscriber::EnvFilter::new("debug"));

    match tracing_subscriber::registry().with(stderr_layer).with(file_layer).try_init() {
        Ok(()) => {}
        Err(e) if already_initialized(&e) => {}
        Err(e) => return Err(io::Error::other(e)),
    }
    eprintln!("Logging to file: {:?}", log_path);
    Ok(Some(guard))
}
