//! Upload discovery and table loading.
//!
//! Turns a CSV export or a JSON table dump into a [`RawTable`]. Only the
//! newest upload in a directory is ever analysed; older uploads are
//! superseded, never merged.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use impact_core::error::{ImpactError, Result};
use impact_core::models::{Cell, RawTable};
use tracing::{debug, warn};

use crate::catalog::EventRecord;

const UPLOAD_EXTENSIONS: &[&str] = &["csv", "json"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Return the most recently modified `.csv` / `.json` file under `dir`.
///
/// Ties on modification time are broken by path so the choice is stable.
pub fn find_latest_upload(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        warn!("Uploads directory does not exist: {}", dir.display());
        return Err(ImpactError::NoUploads(dir.to_path_buf()));
    }

    walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_upload_extension(entry.path()))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.into_path())
        })
        .max()
        .map(|(_, path)| {
            debug!("Latest upload: {}", path.display());
            path
        })
        .ok_or_else(|| ImpactError::NoUploads(dir.to_path_buf()))
}

/// Load a table from disk, choosing the parser by file extension.
pub fn load_table(path: &Path) -> Result<RawTable> {
    let ext = extension_of(path);
    let table = match ext.as_deref() {
        Some("csv") => parse_csv_table(open(path)?)?,
        Some("json") => parse_json_table(&read_to_string(path)?)?,
        _ => return Err(ImpactError::UnsupportedFormat(path.to_path_buf())),
    };
    debug!(
        "Loaded {} with {} columns and {} rows",
        path.display(),
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Parse CSV text whose first record is the header row.
///
/// Every field is read as text; blank fields become [`Cell::Empty`].
pub fn parse_csv_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImpactError::EmptyTable);
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_field).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Parse a `{"headers": [...], "rows": [[...]]}` document.
pub fn parse_json_table(content: &str) -> Result<RawTable> {
    let table: RawTable = serde_json::from_str(content)?;
    if table.headers.is_empty() {
        return Err(ImpactError::EmptyTable);
    }
    Ok(table)
}

/// Load the event catalog: a JSON array of [`EventRecord`]s.
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let content = read_to_string(path)?;
    let events: Vec<EventRecord> = serde_json::from_str(&content)?;
    debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn has_upload_extension(path: &Path) -> bool {
    extension_of(path)
        .map(|e| UPLOAD_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| ImpactError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ImpactError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
