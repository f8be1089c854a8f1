//! Core types and calculations for event impact analysis.
//!
//! Holds the domain model shared by the data and binary crates, the date
//! parsing rules for uploaded spreadsheets, zone accumulation and the
//! summary math.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ImpactError, Result};
