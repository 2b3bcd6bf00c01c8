//! Parses the portal's readings table into per-meter aggregates.

use crate::error::TableParseError;
use crate::model::{AggregatedMeter, MeterReading};
use crate::portal::helper::{cell_text, html_selector, parse_day_first_date, parse_european_number};
use scraper::{ElementRef, Html, Selector};

const TABLE_SELECTOR: &str = "table.listview.ablesungen";
const ROW_SELECTOR: &str = "tr.item";

struct CellSelectors {
    meter: Selector,
    reading_date: Selector,
    reference_date: Selector,
    reading: Selector,
    consumption: Selector,
    reading_type: Selector,
}

impl CellSelectors {
    fn new() -> Result<Self, TableParseError> {
        Ok(Self {
            meter: html_selector("td.zaehler")?,
            reading_date: html_selector("td.ablesetag")?,
            reference_date: html_selector("td.stichtag")?,
            reading: html_selector("td.stand")?,
            consumption: html_selector("td.verbrauch")?,
            reading_type: html_selector("td.ablesart")?,
        })
    }
}

/// Converts the readings page into one aggregate per meter, in first-seen
/// order with rows in table order. A missing table yields an empty result
/// (logged, not fatal); malformed cells degrade to defaults instead of
/// dropping the row.
pub fn parse_readings(html: &str) -> Vec<AggregatedMeter> {
    match try_parse_readings(html) {
        Ok(meters) => meters,
        Err(e) => {
            tracing::error!("Failed to parse readings page: {}", e);
            Vec::new()
        }
    }
}

fn try_parse_readings(html: &str) -> Result<Vec<AggregatedMeter>, TableParseError> {
    let document = Html::parse_document(html);
    let table_selector = html_selector(TABLE_SELECTOR)?;
    let row_selector = html_selector(ROW_SELECTOR)?;
    let cells = CellSelectors::new()?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| TableParseError::table_not_found(TABLE_SELECTOR))?;

    let mut meters: Vec<AggregatedMeter> = Vec::new();
    for row in table.select(&row_selector) {
        // A row without a meter number is skipped silently.
        let meter_number = match cell_text(row, &cells.meter, &["Zähler"]) {
            Some(number) if !number.is_empty() => number,
            _ => continue,
        };

        let reading = parse_row(row, &cells, &meter_number);
        match meters.iter_mut().find(|m| m.meter_number == meter_number) {
            Some(meter) => meter.observe(reading),
            None => meters.push(AggregatedMeter::seed(meter_number, reading)),
        }
    }

    tracing::info!("Found {} meter(s)", meters.len());
    for meter in &meters {
        tracing::info!(
            "Meter {}: {} m³ ({} portal reading(s), date: {:?})",
            meter.meter_number,
            meter.current.reading,
            meter.portal_readings.len(),
            meter.current.primary_date(),
        );
    }
    Ok(meters)
}

fn parse_row(row: ElementRef, cells: &CellSelectors, meter_number: &str) -> MeterReading {
    let reading_date = cell_text(row, &cells.reading_date, &["Ablesetag"])
        .and_then(|text| parse_day_first_date(&text));
    let reference_date = cell_text(row, &cells.reference_date, &["Stichtag"])
        .and_then(|text| parse_day_first_date(&text));
    let reading = parse_numeric_cell(row, &cells.reading, &["Stand", "m³"], "reading", meter_number);
    let consumption = parse_numeric_cell(
        row,
        &cells.consumption,
        &["Verbrauch (m³)", "m³"],
        "consumption",
        meter_number,
    );
    let reading_type = cell_text(row, &cells.reading_type, &["Ableseart"]).unwrap_or_default();

    MeterReading {
        reading_date,
        reference_date,
        reading,
        consumption,
        reading_type,
    }
}

fn parse_numeric_cell(
    row: ElementRef,
    selector: &Selector,
    labels: &[&str],
    field: &str,
    meter_number: &str,
) -> i64 {
    let text = cell_text(row, selector, labels).unwrap_or_else(|| "0".to_string());
    match parse_european_number(&text) {
        Some(value) => value,
        None => {
            tracing::warn!(
                "Meter {}: could not parse {} value '{}'",
                meter_number,
                field,
                text
            );
            0
        }
    }
}
