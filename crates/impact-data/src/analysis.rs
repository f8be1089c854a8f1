//! End-to-end event impact pipeline.
//!
//! Ingests a raw table, builds the metric series, searches the baseline,
//! derives the event zone and returns an [`AnalysisResult`] ready for
//! reporting. The pass is synchronous and never fails: every degenerate
//! input ends in zero totals rather than an error.

use chrono::Utc;
use impact_core::calculations::{SummaryCalculator, ZoneAccumulator};
use impact_core::models::{EventWindow, Metric, MetricTotals, RawTable, Summary, Zone, ZoneKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::baseline::{event_zone, sites_per_day, BaselineWindow, BaselineWindowSearch};
use crate::ingest::TabularIngester;
use crate::series::{MetricSeries, SeriesBuilder};

// ── Public types ──────────────────────────────────────────────────────────────

/// Knobs for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Preferred metric for the baseline search.
    pub baseline_metric: Metric,
    /// Year assigned to `"<day> <month>"` dates.
    pub reference_year: i32,
}

impl AnalysisOptions {
    pub fn new(baseline_metric: Metric, reference_year: i32) -> Self {
        Self {
            baseline_metric,
            reference_year,
        }
    }
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Data rows in the uploaded table.
    pub rows_received: usize,
    /// Rows that made it into the series.
    pub rows_ingested: usize,
    pub blank_rows: usize,
    pub undated_rows: usize,
    pub payload_points: usize,
    pub revenue_points: usize,
    pub users_points: usize,
    /// Distinct sites observed in the baseline series.
    pub sites_per_day: usize,
    /// Metric whose series drove the baseline search, if any had data.
    pub baseline_metric: Option<Metric>,
    pub reference_year: i32,
    /// Wall-clock seconds spent in the pipeline.
    pub analysis_time_seconds: f64,
}

/// The complete output of [`analyze_event`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub window: EventWindow,
    pub summary: Summary,
    /// Event zone first, then the baseline zone when one was found.
    pub zones: Vec<Zone>,
    pub event_totals: MetricTotals,
    pub baseline_totals: MetricTotals,
    pub baseline: Option<BaselineWindow>,
    pub series: MetricSeries,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn event_zone(&self) -> Option<&Zone> {
        self.zones.iter().find(|z| z.kind == ZoneKind::Event)
    }

    pub fn baseline_zone(&self) -> Option<&Zone> {
        self.baseline.as_ref().map(|b| &b.zone)
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full pipeline for one event over one uploaded table.
///
/// 1. Ingest rows and normalise dates.
/// 2. Build the payload, revenue and users series.
/// 3. Search the baseline on the preferred metric, or on the first metric
///    with data when the preferred one is empty.
/// 4. Derive the event zone from the same series.
/// 5. Accumulate every metric over both zones and compute the summary.
///
/// Without a baseline the summary is all zero and only the event zone is
/// returned.
pub fn analyze_event(
    table: &RawTable,
    window: &EventWindow,
    options: &AnalysisOptions,
) -> AnalysisResult {
    let started = std::time::Instant::now();

    // ── Step 1: Ingest ────────────────────────────────────────────────────────
    let report = TabularIngester::new(options.reference_year).ingest_table(table);

    // ── Step 2: Series ────────────────────────────────────────────────────────
    let series = SeriesBuilder::build_all(&table.headers, &report.rows);

    // ── Step 3: Baseline ──────────────────────────────────────────────────────
    let metric = select_baseline_metric(&series, options.baseline_metric);
    let driving: &[_] = metric.map(|m| series.get(m)).unwrap_or(&[]);
    let baseline = BaselineWindowSearch::find_baseline_window(driving, window);

    // ── Step 4: Event zone ────────────────────────────────────────────────────
    let event = event_zone(driving, window);

    // ── Step 5: Totals and summary ────────────────────────────────────────────
    let baseline_zone = baseline.as_ref().map(|b| &b.zone);
    let event_totals = ZoneAccumulator::totals(|m| series.get(m), event.as_ref());
    let baseline_totals = ZoneAccumulator::totals(|m| series.get(m), baseline_zone);

    let summary = if baseline.is_some() {
        SummaryCalculator::compute_summary(&event_totals, &baseline_totals)
    } else {
        info!("No baseline window found for {} .. {}", window.start, window.end);
        Summary::default()
    };

    let mut zones: Vec<Zone> = event.into_iter().collect();
    zones.extend(baseline_zone.cloned());

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        rows_received: table.rows.len(),
        rows_ingested: report.rows.len(),
        blank_rows: report.blank_rows,
        undated_rows: report.undated_rows,
        payload_points: series.payload.len(),
        revenue_points: series.revenue.len(),
        users_points: series.users.len(),
        sites_per_day: sites_per_day(driving),
        baseline_metric: metric,
        reference_year: options.reference_year,
        analysis_time_seconds: started.elapsed().as_secs_f64(),
    };

    AnalysisResult {
        window: *window,
        summary,
        zones,
        event_totals,
        baseline_totals,
        baseline,
        series,
        metadata,
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// `preferred` when its series has data, otherwise the first non-empty
/// series in payload, revenue, users order.
fn select_baseline_metric(series: &MetricSeries, preferred: Metric) -> Option<Metric> {
    if !series.get(preferred).is_empty() {
        return Some(preferred);
    }
    let fallback = Metric::ALL
        .into_iter()
        .find(|m| !series.get(*m).is_empty());
    if let Some(m) = fallback {
        debug!("{} series is empty, searching the baseline on {}", preferred, m);
    }
    fallback
}

// ── Tests ─────────────────────────────────────────────────────────────────────
