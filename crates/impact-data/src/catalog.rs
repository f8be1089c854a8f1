//! Event catalog statistics.
//!
//! Summaries over the list of recorded events: totals, averages, extremes,
//! per-location and per-name averages, ordering and pairwise comparison.

use std::str::FromStr;

use chrono::NaiveDate;
use impact_core::error::ImpactError;
use serde::{Deserialize, Deserializer, Serialize};

// ── EventRecord ───────────────────────────────────────────────────────────────

/// One recorded event with its observed user count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_name: String,
    #[serde(default)]
    pub location: String,
    /// Accepts `YYYY-MM-DD` or a timestamp whose date part comes first.
    #[serde(deserialize_with = "deserialize_event_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub total_users: i64,
}

fn deserialize_event_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d").map_err(serde::de::Error::custom)
}

// ── CatalogStats ──────────────────────────────────────────────────────────────

/// Average user count for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub key: String,
    pub average_users: f64,
    pub events: usize,
}

/// Aggregate view over an event catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_events: usize,
    pub total_users: i64,
    /// Mean users per event, rounded to a whole user.
    pub average_users: f64,
    pub highest: Option<EventRecord>,
    pub lowest: Option<EventRecord>,
    pub latest: Option<EventRecord>,
    /// Averages per location, in first-seen order.
    pub by_location: Vec<GroupAverage>,
    /// Averages per event name, in first-seen order.
    pub by_event: Vec<GroupAverage>,
}

impl CatalogStats {
    pub fn from_events(events: &[EventRecord]) -> Self {
        if events.is_empty() {
            return Self::default();
        }

        let total_users: i64 = events.iter().map(|e| e.total_users).sum();
        let average_users = (total_users as f64 / events.len() as f64).round();

        // Later events win ties for both extremes.
        let highest = events
            .iter()
            .reduce(|prev, curr| if prev.total_users > curr.total_users { prev } else { curr })
            .cloned();
        let lowest = events
            .iter()
            .reduce(|prev, curr| if prev.total_users < curr.total_users { prev } else { curr })
            .cloned();
        // Earlier events win ties for the latest date.
        let latest = events
            .iter()
            .reduce(|best, curr| if curr.date > best.date { curr } else { best })
            .cloned();

        Self {
            total_events: events.len(),
            total_users,
            average_users,
            highest,
            lowest,
            latest,
            by_location: group_averages(events, |e| &e.location),
            by_event: group_averages(events, |e| &e.event_name),
        }
    }
}

fn group_averages<F>(events: &[EventRecord], key_fn: F) -> Vec<GroupAverage>
where
    F: Fn(&EventRecord) -> &String,
{
    let mut groups: Vec<(String, i64, usize)> = Vec::new();
    for event in events {
        let key = key_fn(event);
        match groups.iter_mut().find(|(k, _, _)| k == key) {
            Some((_, total, count)) => {
                *total += event.total_users;
                *count += 1;
            }
            None => groups.push((key.clone(), event.total_users, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(key, total, count)| GroupAverage {
            key,
            average_users: (total as f64 / count as f64).round(),
            events: count,
        })
        .collect()
}

// ── Sorting ───────────────────────────────────────────────────────────────────

/// Orderings offered for the catalog listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    DateAsc,
    #[default]
    DateDesc,
    UsersAsc,
    UsersDesc,
    NameAsc,
    NameDesc,
}

impl FromStr for SortKey {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_asc" => Ok(SortKey::DateAsc),
            "date_desc" => Ok(SortKey::DateDesc),
            "users_asc" => Ok(SortKey::UsersAsc),
            "users_desc" => Ok(SortKey::UsersDesc),
            "name_asc" => Ok(SortKey::NameAsc),
            "name_desc" => Ok(SortKey::NameDesc),
            other => Err(ImpactError::Config(format!("unknown sort key \"{}\"", other))),
        }
    }
}

/// Stable in-place sort of the catalog.
pub fn sort_events(events: &mut [EventRecord], key: SortKey) {
    match key {
        SortKey::DateAsc => events.sort_by(|a, b| a.date.cmp(&b.date)),
        SortKey::DateDesc => events.sort_by(|a, b| b.date.cmp(&a.date)),
        SortKey::UsersAsc => events.sort_by(|a, b| a.total_users.cmp(&b.total_users)),
        SortKey::UsersDesc => events.sort_by(|a, b| b.total_users.cmp(&a.total_users)),
        SortKey::NameAsc => events.sort_by(|a, b| a.event_name.cmp(&b.event_name)),
        SortKey::NameDesc => events.sort_by(|a, b| b.event_name.cmp(&a.event_name)),
    }
}

// ── Comparison ────────────────────────────────────────────────────────────────

/// Difference in users between two events, relative to the second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventComparison {
    /// `a - b`.
    pub diff: i64,
    pub abs_diff: i64,
    /// `|a - b| / b * 100`, two decimals; `0` when `b` has no users.
    pub percent: f64,
}

pub fn compare_events(a: &EventRecord, b: &EventRecord) -> EventComparison {
    let diff = a.total_users - b.total_users;
    let abs_diff = diff.abs();
    let percent = if b.total_users != 0 {
        (abs_diff as f64 / b.total_users as f64 * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };
    EventComparison {
        diff,
        abs_diff,
        percent,
    }
}

/// Look an event up by exact name.
pub fn find_event<'a>(events: &'a [EventRecord], name: &str) -> Option<&'a EventRecord> {
    events.iter().find(|e| e.event_name == name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
