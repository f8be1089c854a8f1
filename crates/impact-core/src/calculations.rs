use crate::models::{Metric, MetricRecord, MetricTotals, Summary, Zone};

/// Upper bound applied to every growth percentage.
pub const GROWTH_CAP: f64 = 999.99;

/// Interface for any labelled point that can be summed over a [`Zone`].
pub trait SeriesPoint {
    /// Join key the zone endpoints are matched against.
    fn label(&self) -> &str;
    /// Numeric value contributed to a zone total.
    fn value(&self) -> f64;
}

impl SeriesPoint for MetricRecord {
    fn label(&self) -> &str {
        &self.label
    }

    fn value(&self) -> f64 {
        self.value
    }
}

// ── ZoneAccumulator ───────────────────────────────────────────────────────────

/// Sums a series over the inclusive label range of a zone.
pub struct ZoneAccumulator;

impl ZoneAccumulator {
    /// Sum values between the first occurrence of `zone.x1` and the first
    /// occurrence of `zone.x2`, inclusive, in whichever order they appear.
    ///
    /// Returns `0.0` when either label is missing from `series`. The series
    /// must already be sorted by date.
    pub fn accumulate<P: SeriesPoint>(series: &[P], zone: &Zone) -> f64 {
        let find = |label: &str| series.iter().position(|p| p.label() == label);
        let (Some(i1), Some(i2)) = (find(&zone.x1), find(&zone.x2)) else {
            return 0.0;
        };
        let (lo, hi) = (i1.min(i2), i1.max(i2));
        series[lo..=hi].iter().map(|p| p.value()).sum()
    }

    /// Accumulate every metric's series over the same zone.
    ///
    /// A missing zone yields all-zero totals.
    pub fn totals<'a, F>(series_for: F, zone: Option<&Zone>) -> MetricTotals
    where
        F: Fn(Metric) -> &'a [MetricRecord],
    {
        let mut totals = MetricTotals::default();
        if let Some(zone) = zone {
            for metric in Metric::ALL {
                totals.set(metric, Self::accumulate(series_for(metric), zone));
            }
        }
        totals
    }
}

// ── SummaryCalculator ─────────────────────────────────────────────────────────

/// Stateless delta and growth calculations.
pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Percentage change of `delta` over `baseline`, capped at
    /// [`GROWTH_CAP`]. A zero baseline gives `0.0`. There is no lower bound.
    pub fn growth(delta: f64, baseline: f64) -> f64 {
        if baseline == 0.0 {
            return 0.0;
        }
        let pct = delta / baseline * 100.0;
        if pct.is_nan() {
            return 0.0;
        }
        pct.min(GROWTH_CAP)
    }

    /// Build the [`Summary`] from event and baseline zone totals.
    pub fn compute_summary(event: &MetricTotals, baseline: &MetricTotals) -> Summary {
        let delta = |m: Metric| event.get(m) - baseline.get(m);
        let growth = |m: Metric| Self::growth(delta(m), baseline.get(m));
        Summary {
            delta_revenue: delta(Metric::Revenue),
            delta_payload: delta(Metric::Payload),
            delta_users: delta(Metric::Users),
            growth_revenue: growth(Metric::Revenue),
            growth_payload: growth(Metric::Payload),
            growth_users: growth(Metric::Users),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
