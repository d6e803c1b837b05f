//! Output formatters for duplicate scan results.
//!
//! This module provides different output formats for scan results:
//! - plain text for reading in a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//! - a box-drawing dump of a snapshot (`tree` subcommand)
//!
//! Every report lists groups in descending-waste order.
//!
//! # Example
//!
//! ```no_run
//! use treedupe::duplicates::DuplicateFinder;
//! use treedupe::error::ExitCode;
//! use treedupe::output::{report_groups, json::JsonOutput};
//! use std::path::PathBuf;
//!
//! let result = DuplicateFinder::with_defaults()
//!     .find_duplicates(&[PathBuf::from(".")])
//!     .unwrap();
//! let groups = report_groups(&result.tree, &result.registry, None);
//! let output = JsonOutput::new(&groups, &result.summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;
pub mod tree;

use std::path::PathBuf;

use crate::duplicates::Registry;
use crate::scanner::{ContentHash, NodeKind, Tree};

// Re-export main types
pub use self::csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
pub use tree::TreeDump;

/// One duplicate group, resolved to paths and byte counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    /// Content hash shared by every member
    pub hash: ContentHash,
    /// Size of one member in bytes
    pub size: u64,
    /// Bytes freed by keeping a single member
    pub duplicated_bytes: u64,
    /// Member paths in registration order
    pub paths: Vec<PathBuf>,
}

impl ReportGroup {
    /// Kind shared by every member.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.hash.kind
    }
}

/// Resolve the registry's duplicate groups to a report, most waste first.
///
/// `limit` caps the number of groups returned.
#[must_use]
pub fn report_groups(tree: &Tree, registry: &Registry, limit: Option<usize>) -> Vec<ReportGroup> {
    registry
        .groups_by_descending_waste(tree)
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(hash, members)| ReportGroup {
            duplicated_bytes: registry.duplicated_bytes(&hash, tree),
            size: members.first().map_or(0, |&id| tree.size(id)),
            paths: members.iter().map(|&id| tree.path(id)).collect(),
            hash,
        })
        .collect()
}
