//! End-to-end tests for the check-in flow.
//!
//! These tests wire the real HTTP client, JSON ledger, and config-backed
//! token store against a mock service in a temp directory, and verify what
//! ends up on disk.

use std::cell::RefCell;
use std::path::Path;

use chrono::{Local, TimeZone};
use checkin_core::{
    AlertPolicy, Alert, Capabilities, CheckinRunner, Clock, Config, ConfigTokenStore, FixedClock,
    HttpCheckinClient, JsonLedgerStore, LedgerStore, Notifier, NotifyError, RunStatus, SystemClock,
};
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Default)]
struct CollectingNotifier {
    sent: RefCell<Vec<Alert>>,
}

impl Notifier for CollectingNotifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(alert.clone());
        Ok(())
    }
}

fn write_config(dir: &Path, base_url: &str, token: &str) -> std::path::PathBuf {
    let path = dir.join("checkin_config.json");
    let doc = json!({
        "base_url": base_url,
        "login": {"email": "me@example.com", "password": "pw"},
        "auth_token": token,
        "email_alerts": {"enabled": true, "on_success": true},
        "custom_note": "keep me",
    });
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Test: a fresh day checks in once and records the outcome on disk.
#[test]
fn test_checkin_records_success_and_skips_second_run() {
    let mut server = mockito::Server::new();
    let user = server
        .mock("GET", "/api/auth/user")
        .with_status(200)
        .with_body(r#"{"email": "me@example.com"}"#)
        .create();
    let checkin = server
        .mock("POST", "/api/checkin")
        .with_status(200)
        .with_body(r#"{"success": true, "message": "签到成功"}"#)
        .expect(1)
        .create();
    let _balance = server
        .mock("GET", "/api/credits/balance")
        .with_status(200)
        .with_body(r#"{"balance": {"available": 10, "used": 0}}"#)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "tok");
    let config = Config::load(&config_path).unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(Config::ledger_path_for(&config_path));
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &SystemClock,
    };

    let first = CheckinRunner::new(caps, config.credential(), config.email_alerts.policy())
        .run_checkin();
    assert_eq!(first.status, RunStatus::CheckedIn);

    let second = CheckinRunner::new(caps, config.credential(), config.email_alerts.policy())
        .run_checkin();
    assert_eq!(second.status, RunStatus::AlreadyComplete);

    checkin.assert();
    user.assert();

    let doc = read_json(ledger.path());
    let today = SystemClock.today().format("%Y-%m-%d").to_string();
    assert_eq!(doc[&today]["success"], true);
    assert_eq!(doc[&today]["result"]["message"], "签到成功");
    assert!(doc[&today]["timestamp"].is_string());

    // One success alert, then one confirmation.
    assert_eq!(notifier.sent.borrow().len(), 2);
}

/// Test: an expired token is replaced in the config document.
#[test]
fn test_refreshed_token_is_written_back() {
    let mut server = mockito::Server::new();
    let _user = server
        .mock("GET", "/api/auth/user")
        .with_status(401)
        .with_body("{}")
        .create();
    let login = server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_body(r#"{"token": "fresh"}"#)
        .create();
    let checkin = server
        .mock("POST", "/api/checkin")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create();
    let _balance = server
        .mock("GET", "/api/credits/balance")
        .with_status(401)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "stale");
    let config = Config::load(&config_path).unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(Config::ledger_path_for(&config_path));
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &SystemClock,
    };

    let report = CheckinRunner::new(caps, config.credential(), AlertPolicy::default())
        .run_checkin();

    assert!(report.succeeded());
    login.assert();
    checkin.assert();

    let doc = read_json(&config_path);
    assert_eq!(doc["auth_token"], "fresh");
    assert_eq!(doc["custom_note"], "keep me");
    assert_eq!(doc["login"]["email"], "me@example.com");
}

/// Test: failed re-authentication never reaches the check-in endpoint.
#[test]
fn test_auth_failure_writes_nothing() {
    let mut server = mockito::Server::new();
    let _user = server
        .mock("GET", "/api/auth/user")
        .with_status(401)
        .create();
    let _login = server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .with_body(r#"{"message": "bad credentials"}"#)
        .create();
    let checkin = server
        .mock("POST", "/api/checkin")
        .expect(0)
        .create();
    let _balance = server
        .mock("GET", "/api/credits/balance")
        .with_status(401)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "stale");
    let config = Config::load(&config_path).unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(Config::ledger_path_for(&config_path));
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &SystemClock,
    };

    let report = CheckinRunner::new(caps, config.credential(), config.email_alerts.policy())
        .run_checkin();

    assert_eq!(report.status, RunStatus::AuthenticationFailed);
    checkin.assert();
    assert!(!ledger.path().exists());
    assert!(ledger.load().is_empty());
    assert_eq!(read_json(&config_path)["auth_token"], "stale");
}

/// Test: a server error is stored with its status and raw text.
#[test]
fn test_server_error_is_recorded_as_failure() {
    let mut server = mockito::Server::new();
    let _user = server
        .mock("GET", "/api/auth/user")
        .with_status(200)
        .with_body("{}")
        .create();
    let _checkin = server
        .mock("POST", "/api/checkin")
        .with_status(500)
        .with_body("Internal Error")
        .create();
    let _balance = server
        .mock("GET", "/api/credits/balance")
        .with_status(500)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "tok");
    let config = Config::load(&config_path).unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(Config::ledger_path_for(&config_path));
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &SystemClock,
    };

    let report = CheckinRunner::new(caps, config.credential(), config.email_alerts.policy())
        .run_checkin();
    assert_eq!(report.status, RunStatus::Rejected);

    let doc = read_json(ledger.path());
    let today = SystemClock.today().format("%Y-%m-%d").to_string();
    assert_eq!(doc[&today]["success"], false);
    assert_eq!(doc[&today]["result"]["status"], 500);
    assert_eq!(doc[&today]["result"]["raw_response"], "Internal Error");

    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Internal Error"));
}

/// Test: a ledger written with offset-less timestamps still prevents a
/// second check-in, and no earlier day is lost.
#[test]
fn test_legacy_ledger_keeps_idempotence_and_history() {
    let mut server = mockito::Server::new();
    let checkin = server
        .mock("POST", "/api/checkin")
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "tok");
    let config = Config::load(&config_path).unwrap();
    let ledger_path = Config::ledger_path_for(&config_path);
    let legacy = r#"{
  "2024-02-28": {"success": true, "timestamp": "2024-02-28T09:00:00.123456", "result": {"message": "ok"}},
  "2024-03-01": {"success": true, "timestamp": "2024-03-01T09:00:00.123456", "result": {"message": "ok"}}
}"#;
    std::fs::write(&ledger_path, legacy).unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(&ledger_path);
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let clock = FixedClock(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &clock,
    };

    let report = CheckinRunner::new(caps, config.credential(), AlertPolicy::default())
        .run_checkin();

    assert_eq!(report.status, RunStatus::AlreadyComplete);
    checkin.assert();
    assert_eq!(ledger.load().len(), 2);
    assert_eq!(std::fs::read_to_string(&ledger_path).unwrap(), legacy);
}

/// Test: a new day appended to a legacy ledger keeps the older entries.
#[test]
fn test_new_day_is_appended_to_legacy_ledger() {
    let mut server = mockito::Server::new();
    let _user = server
        .mock("GET", "/api/auth/user")
        .with_status(200)
        .with_body("{}")
        .create();
    let _checkin = server
        .mock("POST", "/api/checkin")
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create();
    let _balance = server
        .mock("GET", "/api/credits/balance")
        .with_status(500)
        .expect_at_least(0)
        .create();

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.url(), "tok");
    let config = Config::load(&config_path).unwrap();
    let ledger_path = Config::ledger_path_for(&config_path);
    std::fs::write(
        &ledger_path,
        r#"{"2024-02-28": {"success": true, "timestamp": "2024-02-28T09:00:00.123456", "result": {}}}"#,
    )
    .unwrap();

    let api = HttpCheckinClient::new(&config.base_url).unwrap();
    let ledger = JsonLedgerStore::new(&ledger_path);
    let tokens = ConfigTokenStore::new(&config_path);
    let notifier = CollectingNotifier::default();
    let clock = FixedClock(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    let caps = Capabilities {
        api: &api,
        ledger: &ledger,
        credentials: &tokens,
        notifier: &notifier,
        clock: &clock,
    };

    let report = CheckinRunner::new(caps, config.credential(), AlertPolicy::default())
        .run_checkin();
    assert_eq!(report.status, RunStatus::CheckedIn);

    let doc = read_json(&ledger_path);
    assert_eq!(doc["2024-02-28"]["success"], true);
    assert_eq!(doc["2024-03-01"]["success"], true);
}
