//! Day-completion ledger.
//!
//! A JSON document mapping `YYYY-MM-DD` to the outcome recorded for that day.
//! Reads and writes always cover the whole document. A missing document
//! loads as an empty ledger so a first run is never blocked.
//!
//! Entries are append-or-update only. An entry that cannot be read is kept
//! verbatim and written back on the next save, and a document that is not
//! JSON at all is moved aside before anything replaces it.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::write_atomically;
use crate::error::LedgerError;

pub const LEDGER_FILE_NAME: &str = "checkin_status.json";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome recorded for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "success")]
    pub succeeded: bool,
    /// Written as RFC 3339. Offset-less ISO-8601 is read as local time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    /// Raw result payload of the check-in call.
    #[serde(default)]
    pub result: Value,
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one in local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(DateTime::<FixedOffset>::from)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

/// Day-keyed completion record. At most one entry per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<NaiveDate, LedgerEntry>,
    /// Keys or entries that did not parse, carried through saves untouched.
    unreadable: Map<String, Value>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&LedgerEntry> {
        self.entries.get(&date)
    }

    /// Whether `date` already has a successful check-in.
    pub fn is_complete(&self, date: NaiveDate) -> bool {
        self.entries.get(&date).is_some_and(|e| e.succeeded)
    }

    /// Insert or replace the entry for `date`.
    pub fn record(&mut self, date: NaiveDate, entry: LedgerEntry) {
        self.unreadable.remove(&date.format(DATE_FORMAT).to_string());
        self.entries.insert(date, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of raw entries kept only for write-back.
    pub fn unreadable_len(&self) -> usize {
        self.unreadable.len()
    }

    fn from_document(document: Map<String, Value>) -> Self {
        let mut ledger = Self::new();
        for (key, value) in document {
            let date = NaiveDate::parse_from_str(&key, DATE_FORMAT);
            match (date, serde_json::from_value::<LedgerEntry>(value.clone())) {
                (Ok(date), Ok(entry)) => {
                    ledger.entries.insert(date, entry);
                }
                (_, Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "ledger entry unreadable, keeping it as is");
                    ledger.unreadable.insert(key, value);
                }
                (Err(e), _) => {
                    tracing::warn!(key = %key, error = %e, "ledger key is not a date, keeping it as is");
                    ledger.unreadable.insert(key, value);
                }
            }
        }
        ledger
    }
}

/// One document slot on the way out.
#[derive(Serialize)]
#[serde(untagged)]
enum Slot<'a> {
    Entry(&'a LedgerEntry),
    Raw(&'a Value),
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut document: BTreeMap<String, Slot<'_>> = self
            .unreadable
            .iter()
            .map(|(key, value)| (key.clone(), Slot::Raw(value)))
            .collect();
        for (date, entry) in &self.entries {
            document.insert(date.format(DATE_FORMAT).to_string(), Slot::Entry(entry));
        }
        document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_document)
    }
}

/// Whole-document persistence for the ledger.
pub trait LedgerStore {
    /// Read the full ledger. Never fails: absence or corruption yields an
    /// empty ledger, and unreadable entries are kept for write-back.
    fn load(&self) -> Ledger;

    /// Replace the stored ledger with `ledger`.
    fn save(&self, ledger: &Ledger) -> Result<(), LedgerError>;
}

/// Ledger stored as a pretty-printed JSON file.
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt document is moved before it can be overwritten.
    pub fn aside_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| LEDGER_FILE_NAME.to_string());
        self.path.with_file_name(format!("{name}.corrupt"))
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self) -> Ledger {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ledger::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ledger unreadable, starting empty");
                return Ledger::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            let aside = self.aside_path();
            match std::fs::rename(&self.path, &aside) {
                Ok(()) => tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "ledger corrupt, moved aside and starting empty"
                ),
                Err(rename_err) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    rename_error = %rename_err,
                    "ledger corrupt and could not be moved aside, starting empty"
                ),
            }
            Ledger::new()
        })
    }

    fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let content = serde_json::to_string_pretty(ledger)?;
        write_atomically(&self.path, content.as_bytes()).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Ledger kept in memory for the lifetime of the process.
///
/// Used for ephemeral runners where nothing survives between invocations.
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: RefCell<Ledger>,
    saves: RefCell<usize>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Ledger {
        self.ledger.borrow().clone()
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Ledger {
        self.ledger.borrow().clone()
    }

    fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        *self.ledger.borrow_mut() = ledger.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
