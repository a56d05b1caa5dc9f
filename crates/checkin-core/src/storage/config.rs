//! JSON configuration document.
//!
//! Holds:
//! - Service origin and login credentials
//! - The cached bearer token (rewritten after re-authentication)
//! - Email alert policy and SMTP connection settings
//! - Logging level and log retention
//!
//! The document lives at `~/.config/daily-checkin/checkin_config.json` unless
//! a path is given explicitly. Keys this crate does not know about are carried
//! through every rewrite untouched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{data_dir, write_atomically, LEDGER_FILE_NAME};
use crate::auth::{Credential, CredentialStore};
use crate::error::ConfigError;
use crate::notify::{AlertPolicy, SmtpSettings};

pub const CONFIG_FILE_NAME: &str = "checkin_config.json";
pub const DEFAULT_BASE_URL: &str = "https://mirror.o3pro.pro";

/// Login credentials used for re-authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Email alert policy plus SMTP connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAlertsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub to_email: String,
    #[serde(default = "default_true")]
    pub on_failure: bool,
    #[serde(default)]
    pub on_success: bool,
    #[serde(default = "default_true")]
    pub on_token_refresh: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_max_log_days")]
    pub max_log_days: u32,
}

/// Application configuration.
///
/// Serialized to/from JSON. Missing sections fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub email_alerts: EmailAlertsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Unrecognised keys, preserved on save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// Default functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".into()
}
fn default_max_log_days() -> u32 {
    30
}

impl Default for EmailAlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_email: String::new(),
            to_email: String::new(),
            on_failure: true,
            on_success: false,
            on_token_refresh: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_days: default_max_log_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login: LoginConfig::default(),
            auth_token: String::new(),
            email_alerts: EmailAlertsConfig::default(),
            logging: LoggingConfig::default(),
            extra: serde_json::Map::new(),
        }
    }
}

impl EmailAlertsConfig {
    /// Which events may produce an email.
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            enabled: self.enabled,
            on_success: self.on_success,
            on_failure: self.on_failure,
            on_token_refresh: self.on_token_refresh,
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            server: self.smtp_server.clone(),
            port: self.smtp_port,
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            from: self.from_email.clone(),
            to: self.to_email.clone(),
        }
    }
}

impl Config {
    /// Default document location inside [`data_dir`].
    pub fn default_path() -> std::io::Result<PathBuf> {
        Ok(data_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Ledger document kept next to the config document at `config_path`.
    pub fn ledger_path_for(config_path: &Path) -> PathBuf {
        config_path.with_file_name(LEDGER_FILE_NAME)
    }

    /// A document with placeholder credentials, written by `--init`.
    pub fn template() -> Self {
        Self {
            login: LoginConfig {
                email: "your_login_email".into(),
                password: "your_login_password".into(),
            },
            email_alerts: EmailAlertsConfig {
                smtp_server: "smtp.gmail.com".into(),
                smtp_user: "your_email@gmail.com".into(),
                smtp_password: "your_app_password".into(),
                from_email: "your_email@gmail.com".into(),
                to_email: "your_notification_email@example.com".into(),
                ..EmailAlertsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load and validate the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is absent, and a load,
    /// parse, or validation error otherwise.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        let cfg: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to `path`, replacing the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = serde_json::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        write_atomically(path, content.as_bytes()).map_err(|e| save_failed(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "base_url".into(),
            message: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "base_url".into(),
                message: format!("'{}' is not an absolute http(s) URL", self.base_url),
            });
        }
        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential {
            token: self.auth_token.clone(),
            email: self.login.email.clone(),
            password: self.login.password.clone(),
        }
    }
}

/// Persists refreshed tokens back into the config document.
pub struct ConfigTokenStore {
    path: PathBuf,
}

impl ConfigTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for ConfigTokenStore {
    fn persist_token(&self, token: &str) -> Result<(), ConfigError> {
        let mut cfg = Config::load(&self.path)?;
        cfg.auth_token = token.to_string();
        cfg.save(&self.path)
    }
}
