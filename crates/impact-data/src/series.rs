//! Per-metric daily series built from ingested rows.

use std::sync::OnceLock;

use impact_core::models::{Cell, Metric, MetricRecord};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::ingest::IngestedRow;

/// The three metric series of one upload, each sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSeries {
    pub payload: Vec<MetricRecord>,
    pub revenue: Vec<MetricRecord>,
    pub users: Vec<MetricRecord>,
}

impl MetricSeries {
    pub fn get(&self, metric: Metric) -> &[MetricRecord] {
        match metric {
            Metric::Payload => &self.payload,
            Metric::Revenue => &self.revenue,
            Metric::Users => &self.users,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut Vec<MetricRecord> {
        match metric {
            Metric::Payload => &mut self.payload,
            Metric::Revenue => &mut self.revenue,
            Metric::Users => &mut self.users,
        }
    }
}

/// Stateless helper that splits ingested rows into metric series.
pub struct SeriesBuilder;

impl SeriesBuilder {
    /// First non-date header matching `metric`, if any.
    pub fn find_metric_header(headers: &[String], metric: Metric) -> Option<&str> {
        headers
            .iter()
            .skip(1)
            .find(|h| metric.matches_header(h))
            .map(String::as_str)
    }

    /// Build one series from the column `header`.
    ///
    /// No header means an empty series. Rows sharing a date (one per site)
    /// stay distinct; the sort is stable so their upload order is kept.
    pub fn build_series(rows: &[IngestedRow], header: Option<&str>) -> Vec<MetricRecord> {
        let Some(header) = header else {
            return Vec::new();
        };
        let mut series: Vec<MetricRecord> = rows
            .iter()
            .map(|row| MetricRecord {
                date: row.date,
                label: row.label.clone(),
                site: row.site.clone(),
                value: row.cell(header).map(cell_value).unwrap_or(0.0),
            })
            .collect();
        series.sort_by_key(|r| r.date);
        series
    }

    /// Build all three series.
    pub fn build_all(headers: &[String], rows: &[IngestedRow]) -> MetricSeries {
        let mut out = MetricSeries::default();
        for metric in Metric::ALL {
            let header = Self::find_metric_header(headers, metric);
            match header {
                Some(h) => debug!("{} series from column \"{}\"", metric, h),
                None => debug!("No {} column, series left empty", metric),
            }
            *out.get_mut(metric) = Self::build_series(rows, header);
        }
        out
    }
}

fn leading_float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("regex is valid")
    })
}

/// Numeric value of a cell: numbers as-is, text by its leading number,
/// anything else `0`.
pub fn cell_value(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => leading_float_regex()
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<f64>().ok())
            .unwrap_or(0.0),
        Cell::Empty => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
