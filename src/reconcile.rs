//! Combines portal aggregates and ledger entries into the payloads handed to
//! the publishing collaborator.
//!
//! Classification is deliberately a pure function: a wrong answer here
//! silently drops real data, so it has to be trivially testable.

use crate::config::MeterConfig;
use crate::model::{AggregatedMeter, HistoricalEntry, MeterRole};
use chrono::{DateTime, Local, NaiveTime, TimeZone};
use serde_json::json;

pub const ENTITY_MAIN: &str = "sensor.waterportal_water_main";
pub const ENTITY_GARDEN: &str = "sensor.waterportal_water_garden";

const UNIT_CUBIC_METERS: &str = "m³";

/// One sensor update for the home-automation platform: a state value plus an
/// attribute bag.
#[derive(Debug, Clone)]
pub struct SensorUpdate {
    pub entity_id: String,
    /// Current cumulative reading in m³
    pub state: i64,
    pub attributes: serde_json::Value,
}

/// One point of the combined statistics series.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticPoint {
    pub start: DateTime<Local>,
    /// Cumulative reading in m³ at `start`
    pub cumulative: f64,
}

/// Maps a raw meter number to its published role. Empty configuration values
/// leave the role unassigned.
pub fn classify(meter_number: &str, config: &MeterConfig) -> MeterRole {
    let main = config.main_meter_number.trim();
    let garden = config.garden_meter_number.trim();

    if !main.is_empty() && meter_number == main {
        MeterRole::Main
    } else if !garden.is_empty() && meter_number == garden {
        MeterRole::Garden
    } else {
        MeterRole::Unknown
    }
}

/// Builds the sensor update for one meter, or `None` for a meter no role is
/// configured for (dropped with a log line).
pub fn reconcile(
    meter: &AggregatedMeter,
    historical: &[HistoricalEntry],
    config: &MeterConfig,
) -> Option<SensorUpdate> {
    let role = classify(&meter.meter_number, config);
    let (entity_id, friendly_name) = match role {
        MeterRole::Main => (ENTITY_MAIN, config.main_meter_name.as_str()),
        MeterRole::Garden => (ENTITY_GARDEN, config.garden_meter_name.as_str()),
        MeterRole::Unknown => {
            tracing::info!("Skipping unconfigured meter: {}", meter.meter_number);
            return None;
        }
    };

    let current = &meter.current;
    let mut attributes = json!({
        "unit_of_measurement": UNIT_CUBIC_METERS,
        "friendly_name": friendly_name,
        "device_class": "water",
        "state_class": "total_increasing",
        "meter_number": meter.meter_number,
        "reading_type": current.reading_type,
        "consumption": current.consumption,
        "icon": "mdi:water",
    });

    if let Some(reading_date) = current.reading_date {
        attributes["reading_date"] = json!(reading_date.to_string());
    }
    if let Some(reference_date) = current.reference_date {
        attributes["reference_date"] = json!(reference_date.to_string());
    }

    let sorted = meter.sorted_portal_readings();
    if !sorted.is_empty() {
        tracing::info!(
            "Meter {}: {} portal reading(s)",
            meter.meter_number,
            sorted.len()
        );
        attributes["portal_readings"] = sorted
            .iter()
            .map(|row| {
                json!({
                    "date": row.primary_date().map(|d| d.to_string()),
                    "reading": row.reading,
                    "consumption": row.consumption,
                    "reading_type": row.reading_type,
                    "reading_date": row.reading_date.map(|d| d.to_string()),
                    "reference_date": row.reference_date.map(|d| d.to_string()),
                })
            })
            .collect();
        attributes["portal_readings_count"] = json!(sorted.len());
    }

    if !historical.is_empty() {
        tracing::info!(
            "Meter {}: {} historical reading(s)",
            meter.meter_number,
            historical.len()
        );
        attributes["historical_readings"] = json!(historical);
        attributes["historical_count"] = json!(historical.len());
    }

    Some(SensorUpdate {
        entity_id: entity_id.to_string(),
        state: current.reading,
        attributes,
    })
}

/// The combined portal + ledger series for the statistics import: one point
/// per calendar date, ascending, portal values winning on a collision,
/// timestamps at local midnight. Undated portal rows cannot be placed on the
/// timeline and are left out.
pub fn statistics_series(
    meter: &AggregatedMeter,
    historical: &[HistoricalEntry],
) -> Vec<StatisticPoint> {
    let mut by_date = std::collections::BTreeMap::new();
    for entry in historical {
        by_date.insert(entry.date, entry.reading);
    }
    for row in &meter.portal_readings {
        if let Some(date) = row.primary_date() {
            by_date.insert(date, row.reading as f64);
        }
    }

    by_date
        .into_iter()
        .filter_map(|(date, cumulative)| {
            match Local
                .from_local_datetime(&date.and_time(NaiveTime::default()))
                .single()
            {
                Some(start) => Some(StatisticPoint { start, cumulative }),
                None => {
                    tracing::error!("Ambiguous local midnight for {}, skipping point", date);
                    None
                }
            }
        })
        .collect()
}
