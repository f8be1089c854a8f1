mod bootstrap;
mod report;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use impact_core::models::RawTable;
use impact_core::settings::Settings;
use impact_core::time_utils::{reference_year, resolve_timezone};
use impact_data::analysis::{analyze_event, AnalysisOptions};
use impact_data::catalog::{compare_events, find_event, sort_events, CatalogStats, SortKey};
use impact_data::reader::{find_latest_upload, load_events, load_table};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Event Impact v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Timezone: {}, Format: {}",
        settings.view,
        settings.timezone,
        settings.format
    );

    match settings.view.as_str() {
        "impact" => run_impact(&settings).await?,
        "catalog" => run_catalog(&settings).await?,
        unknown => eprintln!("Unknown view mode: {}", unknown),
    }

    Ok(())
}

// ── Impact view ───────────────────────────────────────────────────────────────

async fn run_impact(settings: &Settings) -> Result<()> {
    let window = settings
        .event_window()?
        .ok_or_else(|| anyhow!("the impact view needs an event, pass --start (and --end)"))?;
    let metric = settings.baseline_metric()?;
    let tz = resolve_timezone(&settings.timezone);
    let year = settings
        .reference_year
        .unwrap_or_else(|| reference_year(Some(&window), tz));

    let (path, table) = acquire_table(settings).await?;
    tracing::info!(
        "Analysing {} for {} .. {} (baseline on {}, reference year {})",
        path.display(),
        window.start,
        window.end,
        metric,
        year
    );

    let result = analyze_event(&table, &window, &AnalysisOptions::new(metric, year));

    if settings.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", report::render_impact(&result));
    }
    Ok(())
}

/// Load the table named by `--table`, or the newest upload otherwise.
///
/// File access runs on the blocking pool; the analysis itself does not.
async fn acquire_table(settings: &Settings) -> Result<(PathBuf, RawTable)> {
    let explicit = settings.table.clone();
    let uploads = settings
        .uploads_dir
        .clone()
        .unwrap_or_else(bootstrap::default_uploads_dir);

    let loaded = tokio::task::spawn_blocking(move || -> impact_core::Result<(PathBuf, RawTable)> {
        let path = match explicit {
            Some(p) => p,
            None => find_latest_upload(&uploads)?,
        };
        let table = load_table(&path)?;
        Ok((path, table))
    })
    .await
    .context("table loader task failed")??;

    Ok(loaded)
}

// ── Catalog view ──────────────────────────────────────────────────────────────

async fn run_catalog(settings: &Settings) -> Result<()> {
    let path = settings
        .events
        .clone()
        .ok_or_else(|| anyhow!("the catalog view needs --events <file>"))?;
    let sort: SortKey = settings.sort.parse()?;

    let load_path = path.clone();
    let mut events = tokio::task::spawn_blocking(move || load_events(&load_path))
        .await
        .context("catalog loader task failed")??;
    tracing::info!("Loaded {} events from {}", events.len(), path.display());

    let stats = CatalogStats::from_events(&events);
    sort_events(&mut events, sort);

    let comparison = match settings.compare.as_slice() {
        [] => None,
        [a, b] => match (find_event(&events, a), find_event(&events, b)) {
            (Some(ea), Some(eb)) => Some((ea, eb, compare_events(ea, eb))),
            _ => {
                tracing::warn!("Cannot compare \"{}\" and \"{}\": event not found", a, b);
                None
            }
        },
        other => {
            tracing::warn!("--compare takes exactly two event names, got {}", other.len());
            None
        }
    };

    if settings.format == "json" {
        let doc = serde_json::json!({
            "events": events,
            "stats": stats,
            "comparison": comparison.map(|(_, _, c)| c),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}", report::render_catalog(&events, &stats, comparison));
    }
    Ok(())
}
