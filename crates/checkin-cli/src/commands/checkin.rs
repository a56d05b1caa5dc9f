//! Wiring of the concrete capabilities around [`CheckinRunner`].

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use checkin_core::{
    Capabilities, CheckinRunner, Config, ConfigTokenStore, HttpCheckinClient, JsonLedgerStore,
    LedgerStore, MemoryLedgerStore, SmtpNotifier, SystemClock,
};

use super::{CommandResult, RunOptions};
use crate::logging;

/// Everything a run needs, loaded from the config document.
struct Runtime {
    config: Config,
    api: HttpCheckinClient,
    ledger: Box<dyn LedgerStore>,
    ledger_label: String,
    tokens: ConfigTokenStore,
    notifier: SmtpNotifier,
}

impl Runtime {
    fn load(config_path: &Path, opts: RunOptions) -> checkin_core::Result<(Self, PathBuf)> {
        let config = Config::load(config_path)?;

        let log_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let log_path = logging::init(log_dir, &config.logging, opts.verbose)?;

        let api = HttpCheckinClient::new(&config.base_url)?;

        let (ledger, ledger_label): (Box<dyn LedgerStore>, String) = if opts.ephemeral {
            (Box::new(MemoryLedgerStore::new()), "(in memory)".to_string())
        } else {
            let path = Config::ledger_path_for(config_path);
            let label = path.display().to_string();
            (Box::new(JsonLedgerStore::new(path)), label)
        };

        let notifier = SmtpNotifier::new(config.email_alerts.smtp_settings())
            .with_context(run_context(config_path, &log_path));

        Ok((
            Self {
                api,
                ledger,
                ledger_label,
                tokens: ConfigTokenStore::new(config_path),
                notifier,
                config,
            },
            log_path,
        ))
    }

    fn runner(&self) -> CheckinRunner<'_> {
        let caps = Capabilities {
            api: &self.api,
            ledger: self.ledger.as_ref(),
            credentials: &self.tokens,
            notifier: &self.notifier,
            clock: &SystemClock,
        };
        CheckinRunner::new(
            caps,
            self.config.credential(),
            self.config.email_alerts.policy(),
        )
    }
}

/// Perform today's check-in.
pub fn run(config_path: &Path, opts: RunOptions) -> CommandResult {
    let (runtime, log_path) = Runtime::load(config_path, opts)?;

    if opts.verbose {
        println!("=== Daily check-in (test mode) ===");
        println!("Config file: {}", config_path.display());
        println!("Ledger file: {}", runtime.ledger_label);
        println!("Log file: {}", log_path.display());
        println!();
    }

    let report = runtime.runner().run_checkin();
    tracing::info!(status = ?report.status, "check-in run finished");

    if opts.verbose {
        println!();
        println!(
            "Result: {}",
            if report.succeeded() { "Success" } else { "Failed" }
        );
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Send one test alert without checking in.
pub fn test_email(config_path: &Path, opts: RunOptions) -> CommandResult {
    let (runtime, _) = Runtime::load(config_path, opts)?;

    if runtime.runner().send_test_email() {
        println!("test email sent to {}", runtime.config.email_alerts.to_email);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("test email was not delivered, see the log for details");
        Ok(ExitCode::FAILURE)
    }
}

/// Footer lines identifying where an alert came from.
fn run_context(config_path: &Path, log_path: &Path) -> Vec<String> {
    let mut lines = vec![
        format!("Config file: {}", config_path.display()),
        format!("Log file: {}", log_path.display()),
    ];

    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        let var = |name: &str| std::env::var(name).unwrap_or_else(|_| "unknown".to_string());
        lines.push(format!("GitHub repository: {}", var("GITHUB_REPOSITORY")));
        lines.push(format!("Run id: {}", var("GITHUB_RUN_ID")));
    }
    lines
}
