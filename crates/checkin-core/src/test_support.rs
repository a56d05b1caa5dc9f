//! Scripted fakes for the capabilities the check-in flow depends on.

use std::cell::RefCell;
use std::collections::VecDeque;

use chrono::{DateTime, Local, TimeZone};

use crate::auth::CredentialStore;
use crate::error::{ApiError, ConfigError, NotifyError};
use crate::notify::{Alert, Notifier};
use crate::remote::{ApiResponse, CheckinApi};

pub fn fixed_now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// One canned answer from the fake service.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Unreachable,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Reply::Status(status, body.to_string())
    }

    pub fn unreachable() -> Self {
        Reply::Unreachable
    }

    fn into_result(self, endpoint: &'static str) -> Result<ApiResponse, ApiError> {
        match self {
            Reply::Status(status, body) => Ok(ApiResponse::new(status, body)),
            Reply::Unreachable => Err(ApiError::Transport {
                endpoint,
                message: "connection refused".into(),
            }),
        }
    }
}

/// Fake service answering from per-endpoint queues.
///
/// An exhausted queue falls back to: user 401, login 401, check-in and
/// balance unreachable.
#[derive(Default)]
pub struct ScriptedApi {
    user: RefCell<VecDeque<Reply>>,
    login: RefCell<VecDeque<Reply>>,
    checkin: RefCell<VecDeque<Reply>>,
    balance: RefCell<VecDeque<Reply>>,
    calls: RefCell<Vec<&'static str>>,
    tokens_seen: RefCell<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_user(self, reply: Reply) -> Self {
        self.user.borrow_mut().push_back(reply);
        self
    }

    pub fn on_login(self, reply: Reply) -> Self {
        self.login.borrow_mut().push_back(reply);
        self
    }

    pub fn on_checkin(self, reply: Reply) -> Self {
        self.checkin.borrow_mut().push_back(reply);
        self
    }

    pub fn on_balance(self, reply: Reply) -> Self {
        self.balance.borrow_mut().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == endpoint).count()
    }

    /// Bearer tokens presented to authenticated endpoints, in order.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.borrow().clone()
    }

    fn answer(
        &self,
        endpoint: &'static str,
        queue: &RefCell<VecDeque<Reply>>,
        fallback: Reply,
    ) -> Result<ApiResponse, ApiError> {
        self.calls.borrow_mut().push(endpoint);
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or(fallback)
            .into_result(endpoint)
    }

    fn saw(&self, token: &str) {
        self.tokens_seen.borrow_mut().push(token.to_string());
    }
}

impl CheckinApi for ScriptedApi {
    fn fetch_user(&self, token: &str) -> Result<ApiResponse, ApiError> {
        self.saw(token);
        self.answer("user", &self.user, Reply::status(401, "{}"))
    }

    fn login(&self, _email: &str, _password: &str) -> Result<ApiResponse, ApiError> {
        self.answer("login", &self.login, Reply::status(401, r#"{"message": "bad credentials"}"#))
    }

    fn checkin(&self, token: &str) -> Result<ApiResponse, ApiError> {
        self.saw(token);
        self.answer("checkin", &self.checkin, Reply::unreachable())
    }

    fn balance(&self, token: &str) -> Result<ApiResponse, ApiError> {
        self.saw(token);
        self.answer("balance", &self.balance, Reply::unreachable())
    }
}

/// Notifier that records every alert it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<Alert>>,
    attempts: RefCell<usize>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Alerts delivered successfully.
    pub fn sent(&self) -> Vec<Alert> {
        self.sent.borrow().clone()
    }

    /// Delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        *self.attempts.borrow_mut() += 1;
        if self.fail {
            return Err(NotifyError::Smtp("connection reset".into()));
        }
        self.sent.borrow_mut().push(alert.clone());
        Ok(())
    }
}

/// Credential store that remembers persisted tokens.
#[derive(Default)]
pub struct RecordingStore {
    persisted: RefCell<Vec<String>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn persisted(&self) -> Vec<String> {
        self.persisted.borrow().clone()
    }
}

impl CredentialStore for RecordingStore {
    fn persist_token(&self, token: &str) -> Result<(), ConfigError> {
        if self.fail {
            return Err(ConfigError::SaveFailed {
                path: "/read-only/checkin_config.json".into(),
                message: "permission denied".into(),
            });
        }
        self.persisted.borrow_mut().push(token.to_string());
        Ok(())
    }
}
