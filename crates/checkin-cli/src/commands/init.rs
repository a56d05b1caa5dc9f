use std::path::Path;
use std::process::ExitCode;

use checkin_core::{Config, ConfigError};

use super::CommandResult;

/// Write a template config document to `path`. Never overwrites.
pub fn run(path: &Path) -> CommandResult {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        }
        .into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Config::template().save(path)?;

    println!("wrote template config to {}", path.display());
    println!("fill in login and email settings, then run again");
    Ok(ExitCode::SUCCESS)
}
