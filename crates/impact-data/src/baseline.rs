//! Baseline window search.
//!
//! Finds the quietest run of pre-event days whose weekdays cover every
//! weekday of the event, and turns it into a [`Zone`] over the series.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate};
use impact_core::models::{EventWindow, MetricRecord, Zone, ZoneKind};
use serde::Serialize;
use tracing::debug;

// ── BaselineWindow ────────────────────────────────────────────────────────────

/// The winning candidate of a baseline search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineWindow {
    /// First calendar day of the window.
    pub start: NaiveDate,
    /// Last calendar day of the window.
    pub end: NaiveDate,
    /// Mean value per row across the window.
    pub mean: f64,
    /// Label range covering every site on those days.
    pub zone: Zone,
}

/// All rows observed on one calendar day.
struct DayBucket<'a> {
    date: NaiveDate,
    rows: Vec<&'a MetricRecord>,
}

impl DayBucket<'_> {
    fn distinct_sites(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.site.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }
}

// ── BaselineWindowSearch ──────────────────────────────────────────────────────

/// Stateless sliding-window search over a date-sorted series.
pub struct BaselineWindowSearch;

impl BaselineWindowSearch {
    /// Find the baseline zone for `window`, or `None` when no qualifying
    /// history exists.
    pub fn find_baseline(series: &[MetricRecord], window: &EventWindow) -> Option<Zone> {
        Self::find_baseline_window(series, window).map(|b| b.zone)
    }

    /// Full search result including the window's dates and mean.
    ///
    /// Candidates are runs of `duration` consecutive observed days before the
    /// event start (gaps in the calendar are skipped over, not filled). A
    /// candidate qualifies when
    /// * every day in it carries all `sites_per_day` sites, and
    /// * its weekdays include every weekday of the event (extra weekdays are
    ///   allowed).
    ///
    /// The lowest mean wins; on ties the earliest candidate is kept.
    pub fn find_baseline_window(
        series: &[MetricRecord],
        window: &EventWindow,
    ) -> Option<BaselineWindow> {
        let duration = window.duration_days();
        let event_weekdays = window.weekdays();
        let sites = sites_per_day(series);
        if sites == 0 || duration == 0 {
            return None;
        }

        let past: Vec<&MetricRecord> = series.iter().filter(|r| r.date < window.start).collect();
        if past.len() < duration * sites {
            debug!(
                "Baseline: {} historical rows, need at least {} ({} days x {} sites)",
                past.len(),
                duration * sites,
                duration,
                sites
            );
            return None;
        }

        let days = bucket_by_day(&past);
        if days.len() < duration {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for start in 0..=days.len() - duration {
            let candidate = &days[start..start + duration];

            if candidate.iter().any(|d| d.distinct_sites() != sites) {
                continue;
            }

            let weekdays: BTreeSet<u32> = candidate
                .iter()
                .map(|d| d.date.weekday().num_days_from_monday())
                .collect();
            if !weekdays.is_superset(&event_weekdays) {
                continue;
            }

            let (sum, count) = candidate
                .iter()
                .flat_map(|d| d.rows.iter())
                .fold((0.0, 0usize), |(s, c), r| (s + r.value, c + 1));
            let mean = sum / count as f64;
            if mean.is_nan() {
                continue;
            }

            if best.map_or(true, |(_, m)| mean < m) {
                best = Some((start, mean));
            }
        }

        let Some((start, mean)) = best else {
            debug!("Baseline: no candidate window covers the event weekdays");
            return None;
        };

        let first = days[start].date;
        let last = days[start + duration - 1].date;
        let zone = expand_to_zone(series, first, last)?;
        debug!(
            "Baseline: {} .. {} (mean {:.2}) -> [{} .. {}]",
            first, last, mean, zone.x1, zone.x2
        );

        Some(BaselineWindow {
            start: first,
            end: last,
            mean,
            zone,
        })
    }
}

// ── Zone helpers ──────────────────────────────────────────────────────────────

/// Event zone: from the first row dated inside `window` to the last one.
///
/// `None` when the series has no rows inside the window.
pub fn event_zone(series: &[MetricRecord], window: &EventWindow) -> Option<Zone> {
    let first = series.iter().find(|r| window.contains(r.date))?;
    let last = series.iter().rev().find(|r| window.contains(r.date))?;
    Some(Zone::new(&first.label, &last.label, ZoneKind::Event))
}

/// Number of distinct site values across the whole series. Rows without a
/// site count as one shared value.
pub fn sites_per_day(series: &[MetricRecord]) -> usize {
    series
        .iter()
        .map(|r| r.site.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn bucket_by_day<'a>(rows: &[&'a MetricRecord]) -> Vec<DayBucket<'a>> {
    let mut days: Vec<DayBucket<'a>> = Vec::new();
    for &row in rows {
        match days.last_mut() {
            Some(day) if day.date == row.date => day.rows.push(row),
            _ => days.push(DayBucket {
                date: row.date,
                rows: vec![row],
            }),
        }
    }
    days
}

/// Widen `[first, last]` to every row of the full series on those dates.
fn expand_to_zone(series: &[MetricRecord], first: NaiveDate, last: NaiveDate) -> Option<Zone> {
    let x1 = series.iter().find(|r| r.date == first)?;
    let x2 = series.iter().rev().find(|r| r.date == last)?;
    Some(Zone::new(&x1.label, &x2.label, ZoneKind::Baseline))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
