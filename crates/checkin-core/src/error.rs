//! Core error types for checkin-core.
//!
//! Network and notification failures are caught where they happen and turned
//! into outcomes. Only startup problems (configuration, the HTTP client, the
//! log file) reach `main`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run before the check-in flow starts.
///
/// The binary prints these and exits with status 2.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Api(#[from] ApiError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document does not exist
    #[error("Configuration file not found at {path} (run with --init to create a template)")]
    NotFound { path: PathBuf },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// `--init` target is already present
    #[error("{path} already exists, refusing to overwrite")]
    AlreadyExists { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Transport-level failures talking to the remote service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request did not complete within its time bound
    #[error("{endpoint} request timed out")]
    Timeout { endpoint: &'static str },

    /// Connection, TLS, or body read failure
    #[error("{endpoint} request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// The configured base URL cannot be joined with an endpoint path
    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Re-authentication failures.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The login endpoint answered with a non-200 status
    #[error("Login rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The login response carried neither `token` nor `access_token`
    #[error("No token found in login response: {body}")]
    MissingToken { body: String },

    /// The login request never got an answer
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Ledger persistence errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to write the ledger document
    #[error("Failed to write ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the ledger
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Required SMTP settings are empty
    #[error("Email settings incomplete, missing: {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    /// A from/to address does not parse
    #[error("Invalid email address '{address}': {message}")]
    Address { address: String, message: String },

    /// The message could not be assembled
    #[error("Failed to build email: {0}")]
    Message(String),

    /// The SMTP session failed
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
