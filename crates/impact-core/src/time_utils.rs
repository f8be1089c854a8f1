use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

use crate::error::{ImpactError, Result};
use crate::models::{Cell, EventWindow};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting into a [`Tz`].
///
/// `"auto"` means the system timezone. Unknown names fall back to UTC with a
/// warning.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    let name = if tz_name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// The calendar year "today" in the given timezone.
pub fn current_year(tz: Tz) -> i32 {
    Utc::now().with_timezone(&tz).year()
}

/// Year used to complete `"<day> <month>"` cells: the event's start year, or
/// the current year when there is no event yet.
pub fn reference_year(window: Option<&EventWindow>, tz: Tz) -> i32 {
    window
        .map(|w| w.start.year())
        .unwrap_or_else(|| current_year(tz))
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ImpactError::InvalidDate(s.to_string()))
}

// ── Date cell parsing ─────────────────────────────────────────────────────────

/// Outcome of a single date-format attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParse {
    Parsed(NaiveDate),
    Unparsed,
}

impl DateParse {
    pub fn into_option(self) -> Option<NaiveDate> {
        match self {
            DateParse::Parsed(d) => Some(d),
            DateParse::Unparsed => None,
        }
    }
}

impl From<Option<NaiveDate>> for DateParse {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(DateParse::Unparsed, DateParse::Parsed)
    }
}

/// A single date-format rule.
pub type DateParser = fn(&Cell, i32) -> DateParse;

/// Date rules in priority order; the first `Parsed` wins.
pub const DATE_PARSERS: &[(&str, DateParser)] = &[
    ("spreadsheet-serial", parse_serial_cell),
    ("day-month-year", parse_dmy_cell),
    ("day-month-name", parse_day_month_name_cell),
];

/// Run the date rules against a cell and return the first match.
pub fn parse_date_cell(cell: &Cell, reference_year: i32) -> DateParse {
    DATE_PARSERS
        .iter()
        .map(|(_, parser)| parser(cell, reference_year))
        .find(|outcome| matches!(outcome, DateParse::Parsed(_)))
        .unwrap_or(DateParse::Unparsed)
}

/// Largest serial a spreadsheet can represent (31 Dec 9999).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Decode a spreadsheet date serial.
///
/// Serial `1` is 1 Jan 1900. Serial `60` is the phantom 29 Feb 1900 that
/// spreadsheets inherited and has no real date. The fractional part (time of
/// day) is ignored.
pub fn decode_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let whole = serial.floor() as u64;
    let (epoch, offset) = match whole {
        60 => return None,
        0..=59 => (NaiveDate::from_ymd_opt(1899, 12, 31)?, whole),
        _ => (NaiveDate::from_ymd_opt(1899, 12, 30)?, whole),
    };
    epoch.checked_add_days(Days::new(offset))
}

/// Numeric cells are treated as spreadsheet serials.
pub fn parse_serial_cell(cell: &Cell, _reference_year: i32) -> DateParse {
    match cell {
        Cell::Number(n) => decode_serial(*n).into(),
        _ => DateParse::Unparsed,
    }
}

fn dmy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})$").expect("regex is valid")
    })
}

/// `D/M/Y` or `D-M-Y`; two-digit years land in the 2000s.
pub fn parse_dmy_cell(cell: &Cell, _reference_year: i32) -> DateParse {
    let Cell::Text(text) = cell else {
        return DateParse::Unparsed;
    };
    let Some(caps) = dmy_regex().captures(text.trim()) else {
        return DateParse::Unparsed;
    };
    let day: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let year_raw = &caps[3];
    let year: i32 = match year_raw.parse::<i32>() {
        Ok(y) if year_raw.len() == 2 => 2000 + y,
        Ok(y) => y,
        Err(_) => return DateParse::Unparsed,
    };
    NaiveDate::from_ymd_opt(year, month, day).into()
}

fn day_month_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\s+([A-Za-z]{3,})\.?(?:\s+(\d{4}))?$").expect("regex is valid")
    })
}

/// `"<day> <month name>"` in English or Indonesian, completed with
/// `reference_year` unless the cell carries its own four-digit year.
pub fn parse_day_month_name_cell(cell: &Cell, reference_year: i32) -> DateParse {
    let Cell::Text(text) = cell else {
        return DateParse::Unparsed;
    };
    let Some(caps) = day_month_name_regex().captures(text.trim()) else {
        return DateParse::Unparsed;
    };
    let Some(month) = month_from_name(&caps[2]) else {
        return DateParse::Unparsed;
    };
    let day: u32 = caps[1].parse().unwrap_or(0);
    let year = caps
        .get(3)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(reference_year);
    NaiveDate::from_ymd_opt(year, month, day).into()
}

/// Map a month name to its number by its first three letters.
pub fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" | "mei" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" | "agu" | "agt" => 8,
        "sep" => 9,
        "oct" | "okt" => 10,
        "nov" => 11,
        "dec" | "des" => 12,
        _ => return None,
    };
    Some(month)
}

// ── Labels ────────────────────────────────────────────────────────────────────

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// `"<day> <Mon>"`, suffixed with `" - <site>"` when a site is known.
pub fn format_label(date: NaiveDate, site: Option<&str>) -> String {
    let month = MONTH_ABBREVIATIONS[date.month0() as usize];
    match site {
        Some(site) if !site.is_empty() => format!("{} {} - {}", date.day(), month, site),
        _ => format!("{} {}", date.day(), month),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
