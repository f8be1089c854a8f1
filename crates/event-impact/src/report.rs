//! Plain-text rendering of analysis and catalog results.

use std::fmt::Write;

use chrono::NaiveDate;
use impact_core::formatting::{format_growth, format_number};
use impact_core::models::{Metric, Zone};
use impact_data::analysis::AnalysisResult;
use impact_data::catalog::{CatalogStats, EventComparison, EventRecord};

/// Decimal places shown for a metric's totals and deltas.
fn decimals(metric: Metric) -> usize {
    match metric {
        Metric::Payload => 2,
        Metric::Revenue | Metric::Users => 0,
    }
}

fn metric_title(metric: Metric) -> &'static str {
    match metric {
        Metric::Payload => "Payload",
        Metric::Revenue => "Revenue",
        Metric::Users => "Users",
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn format_zone(zone: Option<&Zone>) -> String {
    match zone {
        Some(z) if z.x1 == z.x2 => z.x1.clone(),
        Some(z) => format!("{} .. {}", z.x1, z.x2),
        None => "none".to_string(),
    }
}

// ── Impact report ─────────────────────────────────────────────────────────────

pub fn render_impact(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let window = &result.window;
    let meta = &result.metadata;

    let _ = writeln!(
        out,
        "Event window:  {} .. {} ({} days)",
        format_date(window.start),
        format_date(window.end),
        window.duration_days()
    );
    let _ = writeln!(out, "Event zone:    {}", format_zone(result.event_zone()));
    match (&result.baseline, meta.baseline_metric) {
        (Some(b), Some(metric)) => {
            let _ = writeln!(
                out,
                "Baseline:      {} ({} .. {}, {} mean {})",
                format_zone(Some(&b.zone)),
                format_date(b.start),
                format_date(b.end),
                metric,
                format_number(b.mean, 2)
            );
        }
        _ => {
            let _ = writeln!(out, "Baseline:      none found, summary is zero");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<10} {:>16} {:>16} {:>16} {:>10}",
        "Metric", "Event", "Baseline", "Delta", "Growth"
    );
    for metric in Metric::ALL {
        let d = decimals(metric);
        let _ = writeln!(
            out,
            "{:<10} {:>16} {:>16} {:>16} {:>10}",
            metric_title(metric),
            format_number(result.event_totals.get(metric), d),
            format_number(result.baseline_totals.get(metric), d),
            format_number(result.summary.delta(metric), d),
            format_growth(result.summary.growth(metric))
        );
    }
    let _ = writeln!(out);

    let _ = write!(
        out,
        "Rows: {} ingested of {} ({} blank, {} undated), {} site(s) per day",
        meta.rows_ingested, meta.rows_received, meta.blank_rows, meta.undated_rows, meta.sites_per_day
    );
    out
}

// ── Catalog report ────────────────────────────────────────────────────────────

fn describe_event(event: Option<&EventRecord>) -> String {
    match event {
        Some(e) => format!(
            "{} ({}, {}) with {} users",
            e.event_name,
            e.location,
            format_date(e.date),
            format_number(e.total_users as f64, 0)
        ),
        None => "-".to_string(),
    }
}

pub fn render_catalog(
    events: &[EventRecord],
    stats: &CatalogStats,
    comparison: Option<(&EventRecord, &EventRecord, EventComparison)>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Events:        {}", stats.total_events);
    let _ = writeln!(out, "Total users:   {}", format_number(stats.total_users as f64, 0));
    let _ = writeln!(out, "Average users: {}", format_number(stats.average_users, 0));
    let _ = writeln!(out, "Highest:       {}", describe_event(stats.highest.as_ref()));
    let _ = writeln!(out, "Lowest:        {}", describe_event(stats.lowest.as_ref()));
    let _ = writeln!(out, "Latest:        {}", describe_event(stats.latest.as_ref()));

    if !stats.by_location.is_empty() {
        let _ = writeln!(out, "\nAverage users by location");
        for group in &stats.by_location {
            let _ = writeln!(
                out,
                "  {:<24} {:>12}",
                group.key,
                format_number(group.average_users, 0)
            );
        }
    }
    if !stats.by_event.is_empty() {
        let _ = writeln!(out, "\nAverage users by event");
        for group in &stats.by_event {
            let _ = writeln!(
                out,
                "  {:<24} {:>12}",
                group.key,
                format_number(group.average_users, 0)
            );
        }
    }

    if !events.is_empty() {
        let _ = writeln!(out, "\n{:<12} {:<24} {:<16} {:>10}", "Date", "Event", "Location", "Users");
        for e in events {
            let _ = writeln!(
                out,
                "{:<12} {:<24} {:<16} {:>10}",
                e.date.format("%Y-%m-%d"),
                e.event_name,
                e.location,
                format_number(e.total_users as f64, 0)
            );
        }
    }

    if let Some((a, b, cmp)) = comparison {
        let _ = writeln!(out, "\n{} vs {}", a.event_name, b.event_name);
        let _ = writeln!(
            out,
            "  Difference: {} users ({}%)",
            format_number(cmp.diff as f64, 0),
            format_number(cmp.percent, 2)
        );
    }

    out.trim_end().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use impact_core::models::{Cell, EventWindow, RawTable};
    use impact_data::analysis::{analyze_event, AnalysisOptions};
    use impact_data::catalog::compare_events;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_table(rows: &[(&str, &str)]) -> RawTable {
        RawTable::new(
            vec!["Date".to_string(), "Revenue".to_string()],
            rows.iter()
                .map(|(d, v)| vec![Cell::from_field(d), Cell::from_field(v)])
                .collect(),
        )
    }

    fn make_event(name: &str, users: i64) -> EventRecord {
        EventRecord {
            event_name: name.to_string(),
            location: "Jakarta".to_string(),
            date: date(2025, 9, 13),
            total_users: users,
        }
    }

    // ── render_impact ─────────────────────────────────────────────────────────

    #[test]
    fn test_render_impact_with_baseline() {
        let table = make_table(&[
            ("06/09/2025", "1000"),
            ("07/09/2025", "1000"),
            ("13/09/2025", "2500"),
            ("14/09/2025", "2500"),
        ]);
        let window = EventWindow::new(date(2025, 9, 13), date(2025, 9, 14)).unwrap();
        let result = analyze_event(&table, &window, &AnalysisOptions::new(Metric::Revenue, 2025));
        let text = render_impact(&result);

        assert!(text.contains("Event window:  13 Sep 2025 .. 14 Sep 2025 (2 days)"));
        assert!(text.contains("Event zone:    13 Sep .. 14 Sep"));
        assert!(text.contains("6 Sep .. 7 Sep"));
        assert!(text.contains("3,000"));
        assert!(text.contains("+150.00%"));
    }

    #[test]
    fn test_render_impact_without_baseline() {
        let table = make_table(&[("13/09/2025", "5")]);
        let window = EventWindow::new(date(2025, 9, 13), date(2025, 9, 13)).unwrap();
        let result = analyze_event(&table, &window, &AnalysisOptions::new(Metric::Revenue, 2025));
        let text = render_impact(&result);

        assert!(text.contains("Event zone:    13 Sep\n"));
        assert!(text.contains("none found"));
        assert!(text.contains("0.00%"));
    }

    // ── render_catalog ────────────────────────────────────────────────────────

    #[test]
    fn test_render_catalog() {
        let events = vec![make_event("Konser", 1500), make_event("Festival", 1000)];
        let stats = CatalogStats::from_events(&events);
        let cmp = compare_events(&events[0], &events[1]);
        let text = render_catalog(&events, &stats, Some((&events[0], &events[1], cmp)));

        assert!(text.contains("Events:        2"));
        assert!(text.contains("Total users:   2,500"));
        assert!(text.contains("Highest:       Konser"));
        assert!(text.contains("Konser vs Festival"));
        assert!(text.contains("Difference: 500 users (50.00%)"));
    }

    #[test]
    fn test_render_catalog_empty() {
        let text = render_catalog(&[], &CatalogStats::default(), None);
        assert!(text.contains("Events:        0"));
        assert!(text.contains("Highest:       -"));
    }
}
