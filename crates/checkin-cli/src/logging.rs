//! Subscriber setup for the binary.
//!
//! Logs go to a monthly file next to the config document and, in test mode
//! or on a terminal, to stdout as well.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use checkin_core::storage::LoggingConfig;
use chrono::Local;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_PREFIX: &str = "checkin_";
const LOG_SUFFIX: &str = ".log";

/// Install the global subscriber. Returns the log file path.
pub fn init(dir: &Path, config: &LoggingConfig, echo: bool) -> std::io::Result<PathBuf> {
    remove_expired_logs(dir, config.max_log_days);

    let path = dir.join(format!("{LOG_PREFIX}{}{LOG_SUFFIX}", Local::now().format("%Y%m")));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.level)));
    let stdout = (echo || std::io::stdout().is_terminal())
        .then(|| tracing_subscriber::fmt::layer().with_target(false));

    // A second install (tests calling in-process) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(stdout)
        .try_init();

    Ok(path)
}

/// Map the config level name onto a filter directive.
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Delete log files older than `max_days`. `0` keeps everything.
fn remove_expired_logs(dir: &Path, max_days: u32) {
    if max_days == 0 {
        return;
    }
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(u64::from(max_days) * 86_400))
    else {
        return;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX)) {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .is_ok_and(|modified| modified < cutoff);
        if expired {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}
