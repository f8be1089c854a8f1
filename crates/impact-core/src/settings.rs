use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ImpactError, Result};
use crate::models::{EventWindow, Metric};
use crate::time_utils::parse_iso_date;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Event impact analysis over uploaded daily site telemetry
#[derive(Parser, Debug, Clone)]
#[command(
    name = "event-impact",
    about = "Event impact analysis over uploaded daily site telemetry",
    version
)]
pub struct Settings {
    /// Uploaded table to analyse (.csv or .json)
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Directory of uploads; the newest .csv/.json file is analysed
    #[arg(long, env = "EVENT_IMPACT_UPLOADS")]
    pub uploads_dir: Option<PathBuf>,

    /// First day of the event (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the event (YYYY-MM-DD, defaults to --start)
    #[arg(long)]
    pub end: Option<String>,

    /// Metric whose series drives the baseline search
    #[arg(long, default_value = "payload", value_parser = ["payload", "revenue", "users"])]
    pub baseline_metric: String,

    /// Year used for "<day> <month>" dates (defaults to the event's year)
    #[arg(long)]
    pub reference_year: Option<i32>,

    /// Timezone used to decide the current year (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// View mode
    #[arg(long, default_value = "impact", value_parser = ["impact", "catalog"])]
    pub view: String,

    /// Event catalog (JSON array) for the catalog view
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Event names to compare in the catalog view (give exactly two)
    #[arg(long)]
    pub compare: Vec<String>,

    /// Sort order for the catalog listing
    #[arg(long, default_value = "date_desc", value_parser = ["date_asc", "date_desc", "users_asc", "users_desc", "name_asc", "name_desc"])]
    pub sort: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.event-impact/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".event-impact").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit args and
    /// config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Event dates and table paths are never restored.
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "baseline_metric") {
            if let Some(v) = last.baseline_metric {
                settings.baseline_metric = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if settings.uploads_dir.is_none() {
            settings.uploads_dir = last.uploads_dir;
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The event window from `--start` / `--end`.
    ///
    /// `--end` alone is rejected; `--start` alone is a one-day event.
    pub fn event_window(&self) -> Result<Option<EventWindow>> {
        match (&self.start, &self.end) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ImpactError::Config(
                "--end requires --start".to_string(),
            )),
            (Some(start), end) => {
                let start = parse_iso_date(start)?;
                let end = match end {
                    Some(e) => parse_iso_date(e)?,
                    None => start,
                };
                EventWindow::new(start, end).map(Some)
            }
        }
    }

    pub fn baseline_metric(&self) -> Result<Metric> {
        self.baseline_metric.parse()
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            timezone: Some(s.timezone.clone()),
            baseline_metric: Some(s.baseline_metric.clone()),
            format: Some(s.format.clone()),
            view: Some(s.view.clone()),
            uploads_dir: s.uploads_dir.clone(),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            timezone: Some("Asia/Jakarta".to_string()),
            baseline_metric: Some("users".to_string()),
            format: Some("json".to_string()),
            view: Some("catalog".to_string()),
            uploads_dir: Some(PathBuf::from("/srv/uploads")),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.timezone.as_deref(), Some("Asia/Jakarta"));
        assert_eq!(loaded.baseline_metric.as_deref(), Some("users"));
        assert_eq!(loaded.format.as_deref(), Some("json"));
        assert_eq!(loaded.view.as_deref(), Some("catalog"));
        assert_eq!(loaded.uploads_dir, Some(PathBuf::from("/srv/uploads")));
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.timezone.is_none());
        assert!(loaded.baseline_metric.is_none());
        assert!(loaded.uploads_dir.is_none());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());
        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    // ── Settings parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["event-impact"]);
        assert!(settings.table.is_none());
        assert!(settings.start.is_none());
        assert_eq!(settings.baseline_metric, "payload");
        assert_eq!(settings.timezone, "auto");
        assert_eq!(settings.view, "impact");
        assert_eq!(settings.sort, "date_desc");
        assert_eq!(settings.format, "text");
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.compare.is_empty());
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_repeated_compare() {
        let settings = Settings::parse_from([
            "event-impact",
            "--compare",
            "Konser A",
            "--compare",
            "Festival B",
        ]);
        assert_eq!(settings.compare, vec!["Konser A", "Festival B"]);
    }

    #[test]
    fn test_event_window_from_start_and_end() {
        let settings = Settings::parse_from([
            "event-impact",
            "--start",
            "2025-09-13",
            "--end",
            "2025-09-15",
        ]);
        let window = settings.event_window().unwrap().unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2025, 9, 13).unwrap());
        assert_eq!(window.duration_days(), 3);
    }

    #[test]
    fn test_event_window_start_only_is_single_day() {
        let settings = Settings::parse_from(["event-impact", "--start", "2025-09-13"]);
        let window = settings.event_window().unwrap().unwrap();
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn test_event_window_errors() {
        let end_only = Settings::parse_from(["event-impact", "--end", "2025-09-13"]);
        assert!(end_only.event_window().is_err());

        let reversed = Settings::parse_from([
            "event-impact",
            "--start",
            "2025-09-15",
            "--end",
            "2025-09-13",
        ]);
        assert!(matches!(
            reversed.event_window(),
            Err(ImpactError::InvalidEventWindow { .. })
        ));

        let garbage = Settings::parse_from(["event-impact", "--start", "13 Sep"]);
        assert!(matches!(
            garbage.event_window(),
            Err(ImpactError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_event_window_absent() {
        let settings = Settings::parse_from(["event-impact"]);
        assert!(settings.event_window().unwrap().is_none());
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_metric() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            baseline_metric: Some("revenue".to_string()),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["event-impact".into()], &config_path);
        assert_eq!(settings.baseline_metric, "revenue");
        assert_eq!(settings.baseline_metric().unwrap(), Metric::Revenue);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            format: Some("json".to_string()),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["event-impact".into(), "--format".into(), "text".into()],
            &config_path,
        );
        assert_eq!(settings.format, "text");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(
            vec!["event-impact".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["event-impact".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        Settings::load_with_last_used_impl(
            vec![
                "event-impact".into(),
                "--baseline-metric".into(),
                "users".into(),
                "--timezone".into(),
                "Asia/Jakarta".into(),
            ],
            &config_path,
        );
        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.baseline_metric.as_deref(), Some("users"));
        assert_eq!(loaded.timezone.as_deref(), Some("Asia/Jakarta"));
    }
}
