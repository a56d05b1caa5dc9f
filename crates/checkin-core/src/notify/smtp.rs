//! Email delivery over SMTP.
//!
//! Port 465 uses implicit TLS; any other port connects in plain text and
//! upgrades with STARTTLS.

use std::time::Duration;

use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{Alert, Notifier};
use crate::error::NotifyError;

const SUBJECT_PREFIX: &str = "[Daily Check-in]";
const IMPLICIT_TLS_PORT: u16 = 465;
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP connection parameters.
#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl SmtpSettings {
    /// Names of required settings that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("smtp_server", &self.server),
            ("smtp_user", &self.user),
            ("smtp_password", &self.password),
            ("from_email", &self.from),
            ("to_email", &self.to),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

pub struct SmtpNotifier {
    settings: SmtpSettings,
    /// Footer lines describing where this run came from.
    context: Vec<String>,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Self {
        Self {
            settings,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, NotifyError> {
        let mailbox = |address: &str| {
            address.parse::<Mailbox>().map_err(|e| NotifyError::Address {
                address: address.to_string(),
                message: e.to_string(),
            })
        };

        Message::builder()
            .from(mailbox(&self.settings.from)?)
            .to(mailbox(&self.settings.to)?)
            .subject(format!("{SUBJECT_PREFIX} {}", alert.subject))
            .header(ContentType::TEXT_PLAIN)
            .body(compose_body(alert, Local::now(), &self.context))
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let server = self.settings.server.as_str();
        let builder = if self.settings.port == IMPLICIT_TLS_PORT {
            tracing::debug!(server, port = self.settings.port, "using implicit TLS");
            SmtpTransport::relay(server)
        } else {
            tracing::debug!(server, port = self.settings.port, "using STARTTLS");
            SmtpTransport::starttls_relay(server)
        }
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        Ok(builder
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.user.clone(),
                self.settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let missing = self.settings.missing_fields();
        if !missing.is_empty() {
            return Err(NotifyError::Incomplete { missing });
        }

        let message = self.build_message(alert)?;
        self.transport()?
            .send(&message)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// Plain-text email body wrapping the alert text.
pub fn compose_body(alert: &Alert, now: DateTime<Local>, context: &[String]) -> String {
    let mut lines = vec![
        "Daily check-in status report".to_string(),
        String::new(),
        format!("Time: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("Type: {}", alert.severity.as_str()),
        String::new(),
        alert.body.clone(),
        String::new(),
        "---".to_string(),
        "Sent automatically by the daily check-in tool".to_string(),
    ];
    lines.extend(context.iter().cloned());
    lines.join("\n")
}
