//! Bearer token lifecycle: validate, re-login on demand, persist.
//!
//! A non-empty token says nothing about validity. Only a 200 from the user
//! endpoint or a successful login establishes it.

use serde_json::Value;

use crate::clock::Clock;
use crate::error::{AuthError, ConfigError};
use crate::notify::{AlertKind, Alerter};
use crate::remote::CheckinApi;

/// Login identity plus the current bearer token.
#[derive(Clone, Default)]
pub struct Credential {
    pub token: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &if self.token.is_empty() { "<empty>" } else { "<redacted>" })
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where refreshed tokens are written so later runs reuse them.
pub trait CredentialStore {
    fn persist_token(&self, token: &str) -> Result<(), ConfigError>;
}

/// What the user endpoint said about the current token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid { email: String },
    /// 401 from the service.
    Expired,
    /// Any other status.
    Rejected(u16),
    /// The request never completed.
    Unreachable,
}

pub struct TokenManager<'a> {
    credential: Credential,
    api: &'a dyn CheckinApi,
    store: &'a dyn CredentialStore,
    alerts: Alerter<'a>,
    clock: &'a dyn Clock,
}

impl<'a> TokenManager<'a> {
    pub fn new(
        credential: Credential,
        api: &'a dyn CheckinApi,
        store: &'a dyn CredentialStore,
        alerts: Alerter<'a>,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            credential,
            api,
            store,
            alerts,
            clock,
        }
    }

    pub fn token(&self) -> &str {
        &self.credential.token
    }

    /// Make sure the held token is usable, logging in again if it is not.
    ///
    /// Returns `false` when the token is invalid and re-authentication failed
    /// too. Never retries within a run.
    pub fn ensure_valid_token(&mut self) -> bool {
        if matches!(self.check_token(), TokenStatus::Valid { .. }) {
            return true;
        }

        match self.refresh() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "re-authentication failed");
                false
            }
        }
    }

    /// Ask the user endpoint whether the current token is accepted.
    pub fn check_token(&self) -> TokenStatus {
        match self.api.fetch_user(&self.credential.token) {
            Ok(resp) if resp.is_ok() => {
                let email = resp
                    .json()
                    .and_then(|v| v.get("email").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::info!(user = %email, "token is valid");
                TokenStatus::Valid { email }
            }
            Ok(resp) if resp.status == 401 => {
                tracing::warn!("token has expired");
                TokenStatus::Expired
            }
            Ok(resp) => {
                tracing::error!(status = resp.status, "token validation failed");
                TokenStatus::Rejected(resp.status)
            }
            Err(e) => {
                tracing::error!(error = %e, "token validation request failed");
                TokenStatus::Unreachable
            }
        }
    }

    fn refresh(&mut self) -> Result<(), AuthError> {
        tracing::info!("logging in again to obtain a new token");
        let token = self.login()?;
        self.credential.token = token;

        if let Err(e) = self.store.persist_token(&self.credential.token) {
            tracing::warn!(error = %e, "refreshed token could not be persisted");
        }
        tracing::info!("login succeeded, token updated");

        self.alerts.emit(
            AlertKind::TokenRefresh,
            "Check-in token refreshed",
            &format!(
                "Logged in again and stored a new authentication token.\nLogin time: {}",
                self.clock.now().format("%Y-%m-%d %H:%M:%S")
            ),
        );
        Ok(())
    }

    fn login(&self) -> Result<String, AuthError> {
        let resp = self
            .api
            .login(&self.credential.email, &self.credential.password)?;
        if !resp.is_ok() {
            return Err(AuthError::Rejected {
                status: resp.status,
                body: resp.body,
            });
        }

        resp.json()
            .as_ref()
            .and_then(extract_token)
            .ok_or(AuthError::MissingToken { body: resp.body })
    }
}

/// Token from a login response: `token`, else `access_token`.
fn extract_token(body: &Value) -> Option<String> {
    ["token", "access_token"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
