use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};

/// One row of the portal's readings table, normalized.
///
/// `reading_date` is the day the meter was physically read (Ablesetag);
/// `reference_date` is a billing cutoff (Stichtag). A record with neither
/// date cannot take part in most-recent comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterReading {
    pub reading_date: Option<NaiveDate>,
    pub reference_date: Option<NaiveDate>,
    /// Cumulative meter reading in m³
    pub reading: i64,
    /// Consumption for the period in m³
    pub consumption: i64,
    /// Free-text classification from the portal (e.g. actual vs. estimated)
    pub reading_type: String,
}

impl MeterReading {
    /// The date that orders this record: the physical read date when the
    /// portal supplies one, the billing cutoff otherwise.
    pub fn primary_date(&self) -> Option<NaiveDate> {
        self.reading_date.or(self.reference_date)
    }
}

/// All readings observed for one meter in a single fetch, plus the currently
/// selected one. Created fresh on every fetch cycle, never persisted.
#[derive(Debug, Clone)]
pub struct AggregatedMeter {
    pub meter_number: String,
    /// The selected "current" reading
    pub current: MeterReading,
    /// Every row seen for this meter, in table row order
    pub portal_readings: Vec<MeterReading>,
}

impl AggregatedMeter {
    /// Creates an aggregate from the first row seen for a meter. That row is
    /// the initial incumbent regardless of whether it carries a date.
    pub fn seed(meter_number: impl Into<String>, row: MeterReading) -> Self {
        Self {
            meter_number: meter_number.into(),
            current: row.clone(),
            portal_readings: vec![row],
        }
    }

    /// Records a further row for this meter. The row always lands in
    /// `portal_readings`; it replaces the current selection only when both
    /// the row and the incumbent carry a primary date and the row's is
    /// strictly later. Ties keep the incumbent.
    pub fn observe(&mut self, row: MeterReading) {
        if let (Some(candidate), Some(incumbent)) = (row.primary_date(), self.current.primary_date())
        {
            if candidate > incumbent {
                self.current = row.clone();
            }
        }
        self.portal_readings.push(row);
    }

    /// Portal readings sorted newest first for display; undated rows last.
    pub fn sorted_portal_readings(&self) -> Vec<MeterReading> {
        let mut rows = self.portal_readings.clone();
        rows.sort_by(|a, b| b.primary_date().cmp(&a.primary_date()));
        rows
    }
}

/// A manually entered historical reading, persisted by the ledger.
///
/// Keyed by `(meter_number, date)`; the meter number is the map key in the
/// ledger document, so it does not repeat here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    /// Calendar date of the reading, no time component
    pub date: NaiveDate,
    /// Cumulative meter reading in m³
    pub reading: f64,
    /// Consumption for the period in m³, when known
    pub consumption: Option<f64>,
    pub reading_type: String,
    /// Always true; distinguishes ledger entries from portal rows
    pub manual: bool,
}
