//! Operator notifications.
//!
//! A [`Notifier`] delivers one [`Alert`]. Whether an event produces an alert
//! at all is decided by [`AlertPolicy`], and [`Alerter`] glues the two
//! together so callers never see a delivery error.

pub mod smtp;

pub use smtp::{SmtpNotifier, SmtpSettings};

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Severity label printed into the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
    Test,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
    pub severity: Severity,
}

/// Delivery channel for alerts.
pub trait Notifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Event that may trigger an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Failure,
    TokenRefresh,
    /// Operator-requested delivery test.
    Test,
}

impl AlertKind {
    fn severity(self) -> Severity {
        match self {
            AlertKind::Success => Severity::Success,
            AlertKind::Failure => Severity::Error,
            AlertKind::TokenRefresh => Severity::Info,
            AlertKind::Test => Severity::Test,
        }
    }
}

/// Per-event email switches. Read-only at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertPolicy {
    pub enabled: bool,
    pub on_success: bool,
    pub on_failure: bool,
    pub on_token_refresh: bool,
}

impl AlertPolicy {
    pub fn allows(&self, kind: AlertKind) -> bool {
        self.enabled
            && match kind {
                AlertKind::Success => self.on_success,
                AlertKind::Failure => self.on_failure,
                AlertKind::TokenRefresh => self.on_token_refresh,
                AlertKind::Test => true,
            }
    }
}

/// Policy-gated, failure-isolated alert dispatch.
#[derive(Clone, Copy)]
pub struct Alerter<'a> {
    notifier: &'a dyn Notifier,
    policy: AlertPolicy,
}

impl<'a> Alerter<'a> {
    pub fn new(notifier: &'a dyn Notifier, policy: AlertPolicy) -> Self {
        Self { notifier, policy }
    }

    pub fn wants(&self, kind: AlertKind) -> bool {
        self.policy.allows(kind)
    }

    /// Send an alert for `kind` if the policy allows it.
    ///
    /// Returns `true` only when the alert was delivered. Delivery errors are
    /// logged here and go no further.
    pub fn emit(&self, kind: AlertKind, subject: &str, body: &str) -> bool {
        if !self.policy.allows(kind) {
            tracing::debug!(?kind, "alert suppressed by policy");
            return false;
        }

        let alert = Alert {
            subject: subject.to_string(),
            body: body.to_string(),
            severity: kind.severity(),
        };
        tracing::info!(subject, severity = alert.severity.as_str(), "sending alert");

        match self.notifier.send(&alert) {
            Ok(()) => {
                tracing::info!(subject, "alert sent");
                true
            }
            Err(e @ NotifyError::Incomplete { .. }) => {
                tracing::warn!(error = %e, "skipping alert");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, subject, "failed to send alert");
                false
            }
        }
    }
}
