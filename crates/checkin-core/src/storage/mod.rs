mod config;
pub mod ledger;

pub use config::{
    Config, ConfigTokenStore, EmailAlertsConfig, LoggingConfig, LoginConfig, CONFIG_FILE_NAME,
    DEFAULT_BASE_URL,
};
pub use ledger::{JsonLedgerStore, Ledger, LedgerEntry, LedgerStore, MemoryLedgerStore, LEDGER_FILE_NAME};

use std::io::Write;
use std::path::{Path, PathBuf};

/// Returns `~/.config/daily-checkin/`, or `$CHECKIN_HOME` when set.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CHECKIN_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("daily-checkin"),
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Replace `path` with `contents` in one step.
///
/// Writes a sibling temp file and renames it over the target, so readers see
/// either the old document or the new one.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}
