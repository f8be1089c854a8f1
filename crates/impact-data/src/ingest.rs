//! Tabular ingestion: raw spreadsheet rows into dated, typed records.
//!
//! Blank rows are dropped, numeric-looking strings are coerced using the
//! `.`-thousands / `,`-decimal convention, and column 0 is normalised into a
//! calendar date. Rows whose date cannot be recovered never reach a series.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use impact_core::models::{Cell, RawTable};
use impact_core::time_utils::{format_label, parse_date_cell};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

// ── IngestedRow ───────────────────────────────────────────────────────────────

/// One usable row, keyed by header, with its canonical date and label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedRow {
    pub date: NaiveDate,
    pub label: String,
    pub site: Option<String>,
    pub cells: HashMap<String, Cell>,
}

impl IngestedRow {
    pub fn cell(&self, header: &str) -> Option<&Cell> {
        self.cells.get(header)
    }
}

/// Ingestion output plus counts of what was discarded.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub rows: Vec<IngestedRow>,
    /// Rows whose cells were all empty.
    pub blank_rows: usize,
    /// Rows whose date column could not be parsed.
    pub undated_rows: usize,
}

// ── TabularIngester ───────────────────────────────────────────────────────────

/// Converts header + rows into [`IngestedRow`]s.
pub struct TabularIngester {
    /// Year used for `"<day> <month>"` dates.
    reference_year: i32,
}

impl TabularIngester {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn ingest_table(&self, table: &RawTable) -> IngestReport {
        self.ingest(&table.headers, &table.rows)
    }

    /// Ingest rows against `headers`. Column 0 is the date column.
    ///
    /// Short rows are padded with empty cells; cells beyond the last header
    /// are ignored.
    pub fn ingest(&self, headers: &[String], rows: &[Vec<Cell>]) -> IngestReport {
        let mut report = IngestReport::default();
        if headers.is_empty() {
            return report;
        }
        let site_col = find_site_column(headers);

        for (idx, raw) in rows.iter().enumerate() {
            if raw.iter().all(Cell::is_empty) {
                report.blank_rows += 1;
                continue;
            }

            let cells: Vec<Cell> = (0..headers.len())
                .map(|i| raw.get(i).map(coerce_cell).unwrap_or_default())
                .collect();

            let Some(date) = parse_date_cell(&cells[0], self.reference_year).into_option() else {
                warn!(
                    "Row {}: unparseable date {:?}, row excluded from all series",
                    idx + 1,
                    cells[0]
                );
                report.undated_rows += 1;
                continue;
            };

            let site = site_col
                .map(|c| cells[c].to_text())
                .filter(|s| !s.is_empty());
            let label = format_label(date, site.as_deref());

            report.rows.push(IngestedRow {
                date,
                label,
                site,
                cells: headers.iter().cloned().zip(cells).collect(),
            });
        }

        debug!(
            "Ingested {} rows ({} blank, {} undated)",
            report.rows.len(),
            report.blank_rows,
            report.undated_rows
        );
        report
    }
}

// ── Cell coercion ─────────────────────────────────────────────────────────────

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9.,]*[0-9][0-9.,]*$").expect("regex is valid"))
}

/// Parse a string made only of digits, `.` and `,`.
///
/// `.` is a thousands separator and `,` the decimal point, so `"1.234,5"`
/// is `1234.5` and `"2.048"` is `2048`.
pub fn parse_localized_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if !numeric_regex().is_match(s) {
        return None;
    }
    s.replace('.', "").replace(',', ".").parse::<f64>().ok()
}

/// Coerce numeric-looking text into [`Cell::Number`]; everything else is
/// returned unchanged.
pub fn coerce_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => match parse_localized_number(s) {
            Some(n) => Cell::Number(n),
            None => cell.clone(),
        },
        other => other.clone(),
    }
}

/// Index of the first non-date column whose header mentions "site".
pub fn find_site_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, h)| h.to_lowercase().contains("site"))
        .map(|(i, _)| i)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    // ── parse_localized_number ────────────────────────────────────────────────

    #[test]
    fn test_parse_localized_number() {
        assert_eq!(parse_localized_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_localized_number("12,75"), Some(12.75));
        assert_eq!(parse_localized_number("2.048"), Some(2048.0));
        assert_eq!(parse_localized_number(" 42 "), Some(42.0));
        assert_eq!(parse_localized_number("1.000.000"), Some(1_000_000.0));
    }

    #[test]
    fn test_parse_localized_number_rejects_non_numeric() {
        assert_eq!(parse_localized_number("13 Sep"), None);
        assert_eq!(parse_localized_number("13/09/2025"), None);
        assert_eq!(parse_localized_number("-5"), None);
        assert_eq!(parse_localized_number(".,"), None);
        assert_eq!(parse_localized_number("1,2,3"), None);
        assert_eq!(parse_localized_number(""), None);
    }

    #[test]
    fn test_coerce_cell() {
        assert_eq!(coerce_cell(&text("45913")), Cell::Number(45913.0));
        assert_eq!(coerce_cell(&text("JKT01")), text("JKT01"));
        assert_eq!(coerce_cell(&Cell::Number(3.5)), Cell::Number(3.5));
        assert_eq!(coerce_cell(&Cell::Empty), Cell::Empty);
    }

    // ── find_site_column ──────────────────────────────────────────────────────

    #[test]
    fn test_find_site_column() {
        assert_eq!(find_site_column(&headers(&["Date", "Site ID", "Rev"])), Some(1));
        assert_eq!(find_site_column(&headers(&["Date", "Rev"])), None);
        // Column 0 is always the date, even if it mentions "site".
        assert_eq!(find_site_column(&headers(&["Site date", "Rev"])), None);
    }

    // ── ingest ────────────────────────────────────────────────────────────────

    #[test]
    fn test_ingest_drops_blank_rows() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![
            vec![Cell::Empty, text("  "), Cell::Empty],
            vec![text("13 Sep"), text("5"), Cell::Empty],
            vec![],
        ];
        let report = ingester.ingest(&headers(&["Date", "Revenue", "Users"]), &rows);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.blank_rows, 2);
        assert_eq!(report.undated_rows, 0);
    }

    #[test]
    fn test_ingest_drops_undated_rows() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![
            vec![text("besok"), text("5")],
            vec![text("31/02/2025"), text("7")],
            vec![text("1/3/2025"), text("9")],
        ];
        let report = ingester.ingest(&headers(&["Date", "Revenue"]), &rows);
        assert_eq!(report.undated_rows, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].label, "1 Mar");
    }

    #[test]
    fn test_ingest_numeric_coercion_of_cells() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![vec![text("13 Sep"), text("1.234,5"), text("n/a")]];
        let report = ingester.ingest(&headers(&["Date", "Revenue", "Note"]), &rows);
        let row = &report.rows[0];
        assert_eq!(row.cell("Revenue"), Some(&Cell::Number(1234.5)));
        assert_eq!(row.cell("Note"), Some(&text("n/a")));
    }

    #[test]
    fn test_ingest_numeric_string_date_is_serial() {
        let ingester = TabularIngester::new(2000);
        let rows = vec![vec![text("45913"), text("1")]];
        let report = ingester.ingest(&headers(&["Date", "Users"]), &rows);
        assert_eq!(report.rows[0].date, NaiveDate::from_ymd_opt(2025, 9, 13).unwrap());
    }

    #[test]
    fn test_ingest_site_label_suffix() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![
            vec![text("13/09/2025"), text("JKT01"), text("5")],
            vec![text("13/09/2025"), Cell::Empty, text("6")],
            vec![text("13/09/2025"), Cell::Number(7.0), text("6")],
        ];
        let report = ingester.ingest(&headers(&["Date", "Site", "Revenue"]), &rows);
        assert_eq!(report.rows[0].label, "13 Sep - JKT01");
        assert_eq!(report.rows[0].site.as_deref(), Some("JKT01"));
        assert_eq!(report.rows[1].label, "13 Sep");
        assert!(report.rows[1].site.is_none());
        assert_eq!(report.rows[2].label, "13 Sep - 7");
    }

    #[test]
    fn test_ingest_dmy_and_day_month_name_share_label() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![
            vec![text("13/09/2025"), text("1")],
            vec![text("13 Sep"), text("2")],
        ];
        let report = ingester.ingest(&headers(&["Date", "Users"]), &rows);
        assert_eq!(report.rows[0].label, "13 Sep");
        assert_eq!(report.rows[1].label, "13 Sep");
        assert_eq!(report.rows[0].date, report.rows[1].date);
    }

    #[test]
    fn test_ingest_pads_short_rows() {
        let ingester = TabularIngester::new(2025);
        let rows = vec![vec![text("13 Sep")]];
        let report = ingester.ingest(&headers(&["Date", "Revenue"]), &rows);
        assert_eq!(report.rows[0].cell("Revenue"), Some(&Cell::Empty));
    }

    #[test]
    fn test_ingest_is_repeatable() {
        let ingester = TabularIngester::new(2025);
        let h = headers(&["Date", "Site", "Payload"]);
        let rows = vec![
            vec![Cell::Number(45913.0), text("A"), text("1.024")],
            vec![text("14 Sep"), text("A"), text("2.048")],
        ];
        assert_eq!(ingester.ingest(&h, &rows).rows, ingester.ingest(&h, &rows).rows);
    }
}
