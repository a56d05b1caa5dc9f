//! Wall-clock capability, injectable so day boundaries are testable.

use chrono::{DateTime, Local, NaiveDate};

pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    /// Local calendar date used as the ledger key.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
