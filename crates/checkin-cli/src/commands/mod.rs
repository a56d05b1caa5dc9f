pub mod checkin;
pub mod init;

use std::path::PathBuf;

use checkin_core::Config;

pub type CommandResult = checkin_core::Result<std::process::ExitCode>;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// `--test`: echo logs and print a banner.
    pub verbose: bool,
    /// `--ephemeral`: ledger lives in memory only.
    pub ephemeral: bool,
}

/// Explicit `--config` path, or the default document location.
pub fn config_path(explicit: Option<PathBuf>) -> checkin_core::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Config::default_path()?),
    }
}
