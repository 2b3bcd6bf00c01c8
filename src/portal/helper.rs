//! Helpers for extracting and normalizing portal HTML cell values.
//!
//! The portal echoes each column header inside the cell text ("Zähler
//! 15093668", "Stand 1.234,5 m³"), uses European decimal formatting, and
//! writes dates day-first in free text. These functions normalize all of
//! that into plain values.

use crate::error::TableParseError;
use chrono::NaiveDate;
use scraper::{ElementRef, Selector};

/// Creates a CSS selector, converting parse failures into our error type.
pub fn html_selector(selector: &str) -> Result<Selector, TableParseError> {
    Selector::parse(selector).map_err(|e| TableParseError::invalid_selector(selector, e))
}

/// Text of the first element matching `selector` within `scope`, with every
/// label fragment the portal echoes into the cell removed, then trimmed.
/// `None` when the cell is absent.
pub fn cell_text(scope: ElementRef, selector: &Selector, labels: &[&str]) -> Option<String> {
    let cell = scope.select(selector).next()?;
    let mut text = cell.text().collect::<String>();
    for label in labels {
        text = text.replace(label, "");
    }
    Some(text.trim().to_string())
}

/// Parses a European-formatted decimal ("1 234,5") and truncates it to an
/// integer. Internal whitespace is dropped, the decimal comma becomes a
/// decimal point. `None` when nothing numeric remains.
pub fn parse_european_number(text: &str) -> Option<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().map(|value| value.trunc() as i64)
}

/// Lenient day-first date parsing for the portal's free-text date cells.
/// Empty or unparsable text yields `None`, never an error.
pub fn parse_day_first_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    const FORMATS: [&str; 4] = ["%d.%m.%Y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y"];
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
