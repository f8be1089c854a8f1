use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ImpactError, Result};

/// A single raw spreadsheet cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// A numeric cell (or a string that was coerced into one).
    Number(f64),
    /// Free text that did not look numeric.
    Text(String),
    /// A blank cell.
    #[default]
    Empty,
}

impl Cell {
    /// Build a cell from a CSV field. Blank fields become [`Cell::Empty`].
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    /// Whether the cell carries no value at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Render the cell as text, e.g. for a site identifier.
    ///
    /// Whole numbers print without a fractional part (`7.0` → `"7"`).
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// An uploaded table: header names plus rows of raw cells.
///
/// Column 0 is always the date column regardless of its header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }
}

/// The three tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Payload,
    Revenue,
    Users,
}

impl Metric {
    /// All metrics, in the order used when falling back to another series.
    pub const ALL: [Metric; 3] = [Metric::Payload, Metric::Revenue, Metric::Users];

    /// Case-insensitive header match for this metric's column.
    pub fn matches_header(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        match self {
            Metric::Revenue => lower.contains("rev"),
            Metric::Payload => lower.contains("payload"),
            Metric::Users => lower.contains("user") || lower.contains("usr"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Payload => "payload",
            Metric::Revenue => "revenue",
            Metric::Users => "users",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "payload" => Ok(Metric::Payload),
            "revenue" => Ok(Metric::Revenue),
            "users" | "user" => Ok(Metric::Users),
            other => Err(ImpactError::Config(format!("unknown metric \"{}\"", other))),
        }
    }
}

/// One point of a per-metric daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: NaiveDate,
    /// Display and join key, e.g. `"13 Sep"` or `"13 Sep - JKT01"`.
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    pub value: f64,
}

/// Inclusive date span of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EventWindow {
    /// Build a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ImpactError::InvalidEventWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, counting both ends.
    pub fn duration_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }

    /// Every calendar day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.duration_days())
    }

    /// Distinct weekdays covered (`0` = Monday … `6` = Sunday).
    pub fn weekdays(&self) -> BTreeSet<u32> {
        self.days()
            .map(|d| d.weekday().num_days_from_monday())
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What a highlighted range stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Event,
    Baseline,
}

/// An inclusive label range over a metric series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub x1: String,
    pub x2: String,
    pub kind: ZoneKind,
}

impl Zone {
    pub fn new(x1: impl Into<String>, x2: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            x1: x1.into(),
            x2: x2.into(),
            kind,
        }
    }
}

/// Per-metric totals over one zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub revenue: f64,
    pub payload: f64,
    pub users: f64,
}

impl MetricTotals {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::Payload => self.payload,
            Metric::Users => self.users,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Revenue => self.revenue = value,
            Metric::Payload => self.payload = value,
            Metric::Users => self.users = value,
        }
    }
}

/// Incremental deltas and capped growth percentages of the event over its
/// baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub delta_revenue: f64,
    pub delta_payload: f64,
    pub delta_users: f64,
    pub growth_revenue: f64,
    pub growth_payload: f64,
    pub growth_users: f64,
}

impl Summary {
    pub fn delta(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Revenue => self.delta_revenue,
            Metric::Payload => self.delta_payload,
            Metric::Users => self.delta_users,
        }
    }

    pub fn growth(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Revenue => self.growth_revenue,
            Metric::Payload => self.growth_payload,
            Metric::Users => self.growth_users,
        }
    }
}
