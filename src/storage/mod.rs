mod procedures;
mod repository;

pub use procedures::*;
pub use repository::*;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Timestamps are stored as fixed-width RFC 3339 strings so that
/// lexicographic order in SQL matches chronological order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}
