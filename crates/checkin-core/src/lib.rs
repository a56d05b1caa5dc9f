//! # Daily Check-in Core Library
//!
//! This library holds the logic of the daily check-in tool: it keeps a
//! bearer token alive, performs at most one successful check-in per local
//! calendar day against the credits service, measures the reward through
//! balance reads, and reports outcomes by email.
//!
//! ## Architecture
//!
//! - **Runner**: one blocking, sequential pass per invocation; the external
//!   scheduler supplies the once-a-day cadence
//! - **Storage**: JSON configuration document and JSON daily ledger, both
//!   written atomically
//! - **Remote**: reqwest-based client that returns raw status and body;
//!   interpretation lives in [`classify`] and [`auth`]
//! - **Notify**: policy-gated alerts delivered over SMTP
//!
//! Every side effect reaches the runner through a trait object bundled in
//! [`Capabilities`], so the whole flow runs against fakes in tests.
//!
//! ## Key Components
//!
//! - [`CheckinRunner`]: the daily check-in flow
//! - [`TokenManager`]: token validation and re-login
//! - [`Config`]: configuration document
//! - [`Ledger`]: per-day outcome record

pub mod auth;
pub mod checkin;
pub mod classify;
pub mod clock;
pub mod error;
pub mod notify;
pub mod remote;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use auth::{Credential, CredentialStore, TokenManager, TokenStatus};
pub use checkin::{Capabilities, CheckinOutcome, CheckinRunner, RunReport, RunStatus};
pub use classify::{classify, CheckinVerdict, Classification};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ApiError, AuthError, ConfigError, CoreError, LedgerError, NotifyError, Result};
pub use notify::{Alert, AlertKind, AlertPolicy, Alerter, Notifier, Severity, SmtpNotifier, SmtpSettings};
pub use remote::{ApiResponse, Balance, CheckinApi, HttpCheckinClient, Timeouts};
pub use storage::{
    data_dir, Config, ConfigTokenStore, JsonLedgerStore, Ledger, LedgerEntry, LedgerStore,
    MemoryLedgerStore,
};
