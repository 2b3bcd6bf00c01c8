//! HTML generation utilities for testing.
//!
//! Builds portal readings pages the way the real portal renders them: each
//! cell echoes its column header before the value, numbers use European
//! decimal formatting, and the whole page carries the "Ablesungen" marker
//! that login verification looks for.

/// One `tr.item` row of the readings table. Empty strings render as empty
/// cells (the label prefix is still echoed, as on the real page).
pub fn readings_row(
    meter: &str,
    ablesetag: &str,
    stichtag: &str,
    stand: &str,
    verbrauch: &str,
    ablesart: &str,
) -> String {
    format!(
        concat!(
            r#"<tr class="item">"#,
            r#"<td class="zaehler">Zähler {}</td>"#,
            r#"<td class="ablesetag">Ablesetag {}</td>"#,
            r#"<td class="stichtag">Stichtag {}</td>"#,
            r#"<td class="stand">Stand {}</td>"#,
            r#"<td class="verbrauch">Verbrauch (m³) {}</td>"#,
            r#"<td class="ablesart">Ableseart {}</td>"#,
            "</tr>"
        ),
        meter, ablesetag, stichtag, stand, verbrauch, ablesart
    )
}

/// A full readings page containing the given rows plus a header row that must
/// not be picked up by the parser.
pub fn readings_page(rows: &[String]) -> String {
    format!(
        concat!(
            "<html><body><h1>Ablesungen</h1>",
            r#"<table class="listview ablesungen">"#,
            r#"<tr class="header"><th>Zähler</th><th>Ablesetag</th><th>Stichtag</th>"#,
            "<th>Stand</th><th>Verbrauch (m³)</th><th>Ableseart</th></tr>",
            "{}",
            "</table></body></html>"
        ),
        rows.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_row_echoes_labels() {
        let row = readings_row("15093668", "01.01.2023", "", "100,0 m³", "10,0 m³", "Ablesung");
        assert!(row.contains("Zähler 15093668"));
        assert!(row.contains("Stand 100,0 m³"));
        assert!(row.contains(r#"class="item""#));
    }

    #[test]
    fn test_readings_page_carries_marker_and_table() {
        let page = readings_page(&[]);
        assert!(page.contains("Ablesungen"));
        assert!(page.contains(r#"table class="listview ablesungen""#));
    }
}
