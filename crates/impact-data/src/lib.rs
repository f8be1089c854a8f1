//! Data side of event impact analysis.
//!
//! Loads uploaded tables and the event catalog from disk, ingests rows into
//! metric series, searches the baseline window and runs the full
//! [`analysis::analyze_event`] pipeline.

pub mod analysis;
pub mod baseline;
pub mod catalog;
pub mod ingest;
pub mod reader;
pub mod series;

pub use impact_core as core;
