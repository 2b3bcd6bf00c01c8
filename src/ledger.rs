//! Persistent store of manually entered historical readings.
//!
//! The backing document is a JSON object mapping meter numbers to arrays of
//! entries. It is loaded once at startup and rewritten in full after every
//! mutation, so the file never lags the in-memory state by more than one
//! failed write. Entries are keyed by `(meter_number, date)`; adding with an
//! existing date replaces that entry in place.

use crate::error::LedgerError;
use crate::model::HistoricalEntry;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type LedgerMap = BTreeMap<String, Vec<HistoricalEntry>>;

pub struct HistoricalLedger {
    path: PathBuf,
    // Single lock around the whole map; mutations are rare and must be
    // serialized anyway because each one rewrites the backing file.
    entries: Mutex<LedgerMap>,
}

impl HistoricalLedger {
    /// Loads the ledger from `path`. A missing file is an empty ledger; an
    /// unreadable or corrupt file is logged and treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<LedgerMap>(&raw) {
                Ok(map) => {
                    let count: usize = map.values().map(Vec::len).sum();
                    tracing::info!("Loaded {} historical reading(s)", count);
                    map
                }
                Err(e) => {
                    tracing::error!("Corrupt historical readings file, starting empty: {}", e);
                    LedgerMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No historical readings file found, starting fresh");
                LedgerMap::new()
            }
            Err(e) => {
                tracing::error!("Error reading historical readings file: {}", e);
                LedgerMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Adds or updates a reading. `date` accepts `YYYY-MM-DD` first, then
    /// `DD.MM.YYYY`. The meter's list stays sorted ascending by date and the
    /// whole document is persisted before returning. False on parse or I/O
    /// failure; never panics past this boundary.
    pub fn add(
        &self,
        meter_number: &str,
        date: &str,
        reading: f64,
        consumption: Option<f64>,
        reading_type: &str,
    ) -> bool {
        let parsed_date = match parse_entry_date(date) {
            Some(parsed) => parsed,
            None => {
                tracing::error!(
                    "Error adding historical reading: {}",
                    LedgerError::BadDate(date.to_string())
                );
                return false;
            }
        };

        let entry = HistoricalEntry {
            date: parsed_date,
            reading,
            consumption,
            reading_type: reading_type.to_string(),
            manual: true,
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let list = entries.entry(meter_number.to_string()).or_default();
        match list.iter_mut().find(|existing| existing.date == parsed_date) {
            Some(existing) => {
                *existing = entry;
                tracing::info!(
                    "Updated historical reading for meter {} on {}",
                    meter_number,
                    parsed_date
                );
            }
            None => {
                list.push(entry);
                tracing::info!(
                    "Added historical reading for meter {} on {}: {} m³",
                    meter_number,
                    parsed_date,
                    reading
                );
            }
        }
        list.sort_by_key(|e| e.date);

        self.persist(&entries)
    }

    /// Deletes the entry matching `date` exactly. Removes the meter key
    /// entirely when its list becomes empty. False for an unknown meter,
    /// an unparsable date, or an I/O failure.
    pub fn delete(&self, meter_number: &str, date: &str) -> bool {
        let parsed_date = match parse_entry_date(date) {
            Some(parsed) => parsed,
            None => {
                tracing::error!(
                    "Error deleting historical reading: {}",
                    LedgerError::BadDate(date.to_string())
                );
                return false;
            }
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = entries.get_mut(meter_number) else {
            tracing::error!(
                "Error deleting historical reading: {}",
                LedgerError::UnknownMeter(meter_number.to_string())
            );
            return false;
        };
        list.retain(|entry| entry.date != parsed_date);
        if list.is_empty() {
            entries.remove(meter_number);
        }
        tracing::info!(
            "Deleted historical reading for meter {} on {}",
            meter_number,
            parsed_date
        );

        self.persist(&entries)
    }

    /// All entries for a meter, ascending by date. Empty for an unknown
    /// meter, never an error.
    pub fn get(&self, meter_number: &str) -> Vec<HistoricalEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(meter_number).cloned().unwrap_or_default()
    }

    /// A snapshot of the full ledger.
    pub fn get_all(&self) -> BTreeMap<String, Vec<HistoricalEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }

    fn persist(&self, entries: &LedgerMap) -> bool {
        match self.try_persist(entries) {
            Ok(()) => {
                tracing::info!("Historical readings saved successfully");
                true
            }
            Err(e) => {
                tracing::error!("Error saving historical readings: {}", e);
                false
            }
        }
    }

    fn try_persist(&self, entries: &LedgerMap) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LedgerError::write_failed(path_string(&self.path), e))?;
            }
        }
        let document = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, document)
            .map_err(|e| LedgerError::write_failed(path_string(&self.path), e))
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

/// ISO format first, day-first German format as the fallback. Anything else
/// is rejected.
fn parse_entry_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%d.%m.%Y"))
        .ok()
}
