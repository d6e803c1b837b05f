//! CSV output formatter for duplicate scan results.
//!
//! One row is generated for each member of each duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based position of the group in descending-waste order
//! - `hash`: content digest (hexadecimal)
//! - `kind`: node kind (`file`, `dir`, `link`, ...)
//! - `path`: path of the member
//! - `size`: member size in bytes
//! - `duplicated_bytes`: bytes freed by keeping one member of the group
//! - `modified`: last modified time (RFC 3339), `unknown` if unavailable

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::ReportGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    kind: &'static str,
    path: String,
    size: u64,
    duplicated_bytes: u64,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [ReportGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [ReportGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            let hash_hex = group.hash.digest_hex();
            for path in &group.paths {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    hash: &hash_hex,
                    kind: group.kind().as_str(),
                    path: path.to_string_lossy().into_owned(),
                    size: group.size,
                    duplicated_bytes: group.duplicated_bytes,
                    modified: modified_time(path),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn modified_time(path: &Path) -> String {
    std::fs::symlink_metadata(path)
        .and_then(|m| m.modified())
        .map(|m| DateTime::<Utc>::from(m).to_rfc3339())
        .unwrap_or_else(|_| "unknown".to_string())
}
