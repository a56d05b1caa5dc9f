//! Daily check-in orchestration.
//!
//! One run is a fixed sequence:
//!
//! ```text
//! ledger says done today? -> confirm, stop
//! balance (before) -> ensure token -> check-in -> classify
//!     -> balance (after) -> ledger write -> alert
//! ```
//!
//! Ordering matters: the token is validated before the check-in, and the
//! second balance read happens only after the check-in. Nothing here runs
//! concurrently and nothing is retried within a run; the scheduler reruns.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{Credential, CredentialStore, TokenManager};
use crate::classify::{classify, CheckinVerdict, Classification};
use crate::clock::Clock;
use crate::notify::{AlertKind, AlertPolicy, Alerter, Notifier};
use crate::remote::{Balance, CheckinApi};
use crate::storage::{Ledger, LedgerEntry, LedgerStore};

/// Everything a run touches outside its own memory.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub api: &'a dyn CheckinApi,
    pub ledger: &'a dyn LedgerStore,
    pub credentials: &'a dyn CredentialStore,
    pub notifier: &'a dyn Notifier,
    pub clock: &'a dyn Clock,
}

/// Result of one check-in attempt that reached the service.
#[derive(Debug, Clone, Serialize)]
pub struct CheckinOutcome {
    pub succeeded: bool,
    pub verdict: CheckinVerdict,
    /// `after - before` of the available balance, 0 unless both reads worked.
    pub reward_delta: i64,
    pub message: String,
    pub payload: Value,
    pub balance_before: Option<Balance>,
    pub balance_after: Option<Balance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The ledger already held a successful entry for today.
    AlreadyComplete,
    /// The service accepted the check-in (or said it was already done).
    CheckedIn,
    /// No usable token; the service was never asked to check in.
    AuthenticationFailed,
    /// The check-in call failed or was refused.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub outcome: Option<CheckinOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, RunStatus::AlreadyComplete | RunStatus::CheckedIn)
    }
}

/// Available-balance gain between two reads; 0 if either read failed.
pub fn reward_delta(before: Option<Balance>, after: Option<Balance>) -> i64 {
    match (before, after) {
        (Some(before), Some(after)) => after.available - before.available,
        _ => 0,
    }
}

pub struct CheckinRunner<'a> {
    api: &'a dyn CheckinApi,
    ledger: &'a dyn LedgerStore,
    clock: &'a dyn Clock,
    alerts: Alerter<'a>,
    tokens: TokenManager<'a>,
}

impl<'a> CheckinRunner<'a> {
    pub fn new(caps: Capabilities<'a>, credential: Credential, policy: AlertPolicy) -> Self {
        let alerts = Alerter::new(caps.notifier, policy);
        Self {
            api: caps.api,
            ledger: caps.ledger,
            clock: caps.clock,
            alerts,
            tokens: TokenManager::new(credential, caps.api, caps.credentials, alerts, caps.clock),
        }
    }

    pub fn tokens(&self) -> &TokenManager<'a> {
        &self.tokens
    }

    /// Perform today's check-in unless the ledger says it is done.
    pub fn run_checkin(&mut self) -> RunReport {
        tracing::info!("starting daily check-in");

        let today = self.clock.today();
        let mut ledger = self.ledger.load();
        if ledger.is_complete(today) {
            return self.confirm_already_complete(today);
        }

        let before = self.read_balance();

        if !self.tokens.ensure_valid_token() {
            // The service was never reached, so today stays unrecorded and
            // the next run tries again.
            tracing::error!("no valid authentication token, check-in not attempted");
            self.alerts.emit(
                AlertKind::Failure,
                "Check-in failed",
                "Could not obtain a valid authentication token: the cached token was \
                 rejected and logging in again failed.\n\n\
                 Please check the login credentials in the configuration.",
            );
            return RunReport {
                status: RunStatus::AuthenticationFailed,
                outcome: None,
            };
        }

        let result = self.api.checkin(self.tokens.token());
        let classification = classify(&result);

        let outcome = if classification.verdict.is_success() {
            self.on_success(&mut ledger, today, classification, before)
        } else {
            self.on_failure(&mut ledger, today, classification, before)
        };

        RunReport {
            status: if outcome.succeeded {
                RunStatus::CheckedIn
            } else {
                RunStatus::Rejected
            },
            outcome: Some(outcome),
        }
    }

    /// Send a test alert through the configured notifier.
    ///
    /// Returns whether the alert was delivered.
    pub fn send_test_email(&self) -> bool {
        tracing::info!("sending test email");
        if !self.alerts.wants(AlertKind::Test) {
            tracing::warn!("email alerts are disabled, nothing to test");
            return false;
        }

        let balance = self.read_balance();
        let body = format!(
            "This is a test message from the daily check-in tool.{}\n\n\
             If you received it, email alerts are configured correctly.",
            breakdown_suffix(balance)
        );
        self.alerts.emit(AlertKind::Test, "Email alert test", &body)
    }

    fn confirm_already_complete(&self, today: NaiveDate) -> RunReport {
        tracing::info!(%today, "check-in already recorded as successful today, skipping");

        if self.alerts.wants(AlertKind::Success) {
            let balance = self.read_balance();
            let body = format!(
                "Today's check-in status: complete{}",
                breakdown_suffix(balance)
            );
            self.alerts
                .emit(AlertKind::Success, "Check-in status confirmation", &body);
        } else {
            tracing::debug!("success alerts disabled, no confirmation sent");
        }

        RunReport {
            status: RunStatus::AlreadyComplete,
            outcome: None,
        }
    }

    fn on_success(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
        classification: Classification,
        before: Option<Balance>,
    ) -> CheckinOutcome {
        let after = self.read_balance();
        let earned = reward_delta(before, after);
        self.record(ledger, today, true, &classification.payload);

        let (subject, body) = match (earned > 0, before, after) {
            (true, Some(before), Some(after)) => {
                let summary = format!(
                    "Check-in succeeded! Earned {earned} credits, balance: {} -> {}",
                    before.available, after.available
                );
                tracing::info!("{summary}");
                ("Check-in succeeded", format!("{summary}{}", breakdown_suffix(Some(after))))
            }
            _ if classification.verdict == CheckinVerdict::AlreadyCheckedIn => {
                tracing::info!(message = %classification.message, "already checked in today");
                (
                    "Check-in complete",
                    format!(
                        "Check-in status: {}{}",
                        classification.message,
                        breakdown_suffix(after)
                    ),
                )
            }
            _ => {
                tracing::info!("check-in complete (already checked in today)");
                (
                    "Check-in complete",
                    format!(
                        "Check-in complete (already checked in today){}",
                        breakdown_suffix(after)
                    ),
                )
            }
        };
        self.alerts.emit(AlertKind::Success, subject, &body);

        CheckinOutcome {
            succeeded: true,
            verdict: classification.verdict,
            reward_delta: earned,
            message: classification.message,
            payload: classification.payload,
            balance_before: before,
            balance_after: after,
        }
    }

    fn on_failure(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
        classification: Classification,
        before: Option<Balance>,
    ) -> CheckinOutcome {
        tracing::error!(message = %classification.message, "check-in failed");
        self.record(ledger, today, false, &classification.payload);

        let details = serde_json::to_string_pretty(&classification.payload)
            .unwrap_or_else(|_| classification.payload.to_string());
        self.alerts.emit(
            AlertKind::Failure,
            "Check-in failed",
            &format!(
                "Check-in failed: {}\n\nDetails:\n{details}\n\n\
                 Please check network connectivity and the configuration.",
                classification.message
            ),
        );

        CheckinOutcome {
            succeeded: false,
            verdict: classification.verdict,
            reward_delta: 0,
            message: classification.message,
            payload: classification.payload,
            balance_before: before,
            balance_after: None,
        }
    }

    /// Best-effort balance read. Failures only cost telemetry.
    fn read_balance(&self) -> Option<Balance> {
        match self.api.balance(self.tokens.token()) {
            Ok(resp) if resp.is_ok() => {
                let balance = resp.json().as_ref().and_then(Balance::from_json);
                if balance.is_none() {
                    tracing::warn!("balance response had no balance object");
                }
                balance
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status, "balance query refused");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "balance query failed");
                None
            }
        }
    }

    fn record(&self, ledger: &mut Ledger, today: NaiveDate, succeeded: bool, payload: &Value) {
        ledger.record(
            today,
            LedgerEntry {
                succeeded,
                timestamp: self.clock.now().into(),
                result: payload.clone(),
            },
        );
        if let Err(e) = self.ledger.save(ledger) {
            tracing::error!(error = %e, "failed to save ledger");
        }
    }
}

fn breakdown_suffix(balance: Option<Balance>) -> String {
    balance
        .map(|b| format!("\n\n{}", b.breakdown()))
        .unwrap_or_default()
}
