//! Interpretation of check-in responses.
//!
//! The service reports a repeat check-in as `success: false` with a
//! human-readable message, so "already checked in" is detected by substring.
//! All of that knowledge is kept in this module.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::remote::ApiResponse;

/// Message fragments the service uses for a repeat check-in.
///
/// Known set, not guaranteed complete.
pub const ALREADY_CHECKED_IN_MARKERS: &[&str] = &["已签到", "已经签到", "already checked in"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinVerdict {
    /// The service accepted today's check-in.
    CheckedIn,
    /// The service says today's check-in was already done.
    AlreadyCheckedIn,
    /// The service was reached but refused, or the call failed.
    Rejected,
}

impl CheckinVerdict {
    pub fn is_success(self) -> bool {
        !matches!(self, CheckinVerdict::Rejected)
    }
}

/// Verdict plus the payload recorded in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub verdict: CheckinVerdict,
    pub message: String,
    pub payload: Value,
}

pub fn is_already_checked_in(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ALREADY_CHECKED_IN_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Classify the outcome of a check-in call.
pub fn classify(result: &Result<ApiResponse, ApiError>) -> Classification {
    match result {
        Ok(response) if response.is_ok() => classify_accepted(response),
        Ok(response) => classify_error_status(response),
        Err(e) => Classification {
            verdict: CheckinVerdict::Rejected,
            message: e.to_string(),
            payload: json!({ "error": e.to_string() }),
        },
    }
}

fn classify_accepted(response: &ApiResponse) -> Classification {
    let Some(body) = response.json() else {
        // 200 without JSON: the side effect is assumed to have happened.
        return Classification {
            verdict: CheckinVerdict::CheckedIn,
            message: "check-in accepted (non-JSON response)".into(),
            payload: json!({
                "message": "check-in accepted",
                "raw_response": response.body,
            }),
        };
    };

    let message = message_of(&body);
    let verdict = if body.get("success").map_or(true, truthy) {
        CheckinVerdict::CheckedIn
    } else if is_already_checked_in(&message) {
        CheckinVerdict::AlreadyCheckedIn
    } else {
        CheckinVerdict::Rejected
    };

    Classification {
        verdict,
        message,
        payload: body,
    }
}

fn classify_error_status(response: &ApiResponse) -> Classification {
    let payload = response.json().unwrap_or_else(|| {
        json!({
            "error": format!("HTTP {}", response.status),
            "status": response.status,
            "raw_response": response.body,
        })
    });

    let message = message_of(&payload);
    // A repeat check-in may also arrive as an error status with the marker.
    if is_already_checked_in(&message) {
        return Classification {
            verdict: CheckinVerdict::AlreadyCheckedIn,
            message,
            payload,
        };
    }

    Classification {
        verdict: CheckinVerdict::Rejected,
        message: if message.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            message
        },
        payload,
    }
}

fn message_of(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Loose truthiness for the `success` flag.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
