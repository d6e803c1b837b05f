//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "duplicates": [
//!     {
//!       "hash": "abc123...",
//!       "kind": "dir",
//!       "size": 1024,
//!       "count": 2,
//!       "duplicated_bytes": 1024,
//!       "paths": ["/a/photos", "/b/photos-copy"]
//!     }
//!   ],
//!   "summary": {
//!     "total_entries": 100,
//!     "total_size": 1048576,
//!     "candidates": 12,
//!     "duplicate_groups": 5,
//!     "reclaimable_space": 51200,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "TD000"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ReportGroup;
use crate::duplicates::ScanSummary;
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content digest as hexadecimal string
    pub hash: String,
    /// Node kind of every member
    pub kind: String,
    /// Size of one member in bytes
    pub size: u64,
    /// Number of members
    pub count: usize,
    /// Bytes freed by keeping a single member
    pub duplicated_bytes: u64,
    /// Member paths
    pub paths: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a report group.
    #[must_use]
    pub fn from_report_group(group: &ReportGroup) -> Self {
        Self {
            hash: group.hash.digest_hex(),
            kind: group.kind().as_str().to_string(),
            size: group.size,
            count: group.paths.len(),
            duplicated_bytes: group.duplicated_bytes,
            paths: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Nodes under all roots, directories included
    pub total_entries: u64,
    /// Total size of all roots in bytes
    pub total_size: u64,
    /// Whether structural pruning ran
    pub pruned: bool,
    /// Nodes that survived pruning
    pub candidates: usize,
    /// Leaf files hashed
    pub leaves_hashed: usize,
    /// Leaf bytes read
    pub leaf_bytes: u64,
    /// Leaves that could not be read
    pub leaves_failed: usize,
    /// Leaves whose filter exited unsuccessfully
    pub filter_failures: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total space that can be reclaimed (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "TD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_entries: summary.total_entries,
            total_size: summary.total_size,
            pruned: summary.pruned,
            candidates: summary.candidates,
            leaves_hashed: summary.leaves.files,
            leaf_bytes: summary.leaves.bytes,
            leaves_failed: summary.leaves.failed,
            filter_failures: summary.leaves.filter_failures,
            duplicate_groups: summary.duplicate_groups,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Duplicate groups, most waste first
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from report groups, summary and exit code.
    #[must_use]
    pub fn new(groups: &[ReportGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_report_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
