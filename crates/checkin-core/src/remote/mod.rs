//! Remote service contract.
//!
//! The transport only moves bytes: each call yields the HTTP status and raw
//! body, and everything that decides what a response *means* lives in the
//! token manager and the response classifier.

pub mod http;

pub use http::{HttpCheckinClient, Timeouts};

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// The four calls the check-in flow makes against the service.
pub trait CheckinApi {
    /// `GET /api/auth/user` with bearer auth.
    fn fetch_user(&self, token: &str) -> Result<ApiResponse, ApiError>;

    /// `POST /api/auth/login` with `{email, password}`.
    fn login(&self, email: &str, password: &str) -> Result<ApiResponse, ApiError>;

    /// `POST /api/checkin` with bearer auth and an empty JSON body.
    fn checkin(&self, token: &str) -> Result<ApiResponse, ApiError>;

    /// `GET /api/credits/balance` with bearer auth.
    fn balance(&self, token: &str) -> Result<ApiResponse, ApiError>;
}

/// Credit balance as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Balance {
    pub available: i64,
    pub used: i64,
}

impl Balance {
    pub fn total(&self) -> i64 {
        self.available + self.used
    }

    /// Read `{balance: {available, used}}`. Missing numbers count as zero;
    /// a body without a `balance` object yields `None`.
    ///
    /// Credits are whole numbers. A fractional value is truncated toward
    /// zero, and the dropped part is logged at debug level.
    pub fn from_json(body: &Value) -> Option<Self> {
        let balance = body.get("balance")?.as_object()?;
        let read = |key: &str| balance.get(key).and_then(|v| whole_credits(key, v)).unwrap_or(0);
        Some(Self {
            available: read("available"),
            used: read("used"),
        })
    }

    /// Multi-line breakdown used in alert bodies.
    pub fn breakdown(&self) -> String {
        format!(
            "Credits:\n  Total: {}\n  Available: {}\n  Used: {}",
            self.total(),
            self.available,
            self.used
        )
    }
}

fn whole_credits(key: &str, value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() != 0.0 {
        tracing::debug!(key, value = f, "fractional credit balance truncated");
    }
    Some(f as i64)
}
