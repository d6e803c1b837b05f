//! Plain-text report for terminals and pipes.
//!
//! ```text
//! 1. [3f2a...9c dir] 3 copies, 4.0 KiB duplicated
//!    "/a/photos"
//!    "/b/photos"
//!    "/c/photos"
//!
//! 1 duplicate groups, 4.0 KiB reclaimable
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use super::ReportGroup;
use crate::duplicates::ScanSummary;

/// Text report formatter.
pub struct TextOutput<'a> {
    groups: &'a [ReportGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter over report groups and the scan summary.
    #[must_use]
    pub fn new(groups: &'a [ReportGroup], summary: &'a ScanSummary) -> Self {
        Self { groups, summary }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(
                writer,
                "{}. [{}] {} copies, {} duplicated",
                idx + 1,
                group.hash,
                group.paths.len(),
                ByteSize::b(group.duplicated_bytes)
            )?;
            for path in &group.paths {
                writeln!(writer, "   {path:?}")?;
            }
            writeln!(writer)?;
        }

        let shown = self.groups.len();
        if shown < self.summary.duplicate_groups {
            writeln!(
                writer,
                "showing {shown} of {} duplicate groups, {} reclaimable",
                self.summary.duplicate_groups,
                self.summary.reclaimable_display()
            )
        } else {
            writeln!(
                writer,
                "{} duplicate groups, {} reclaimable",
                self.summary.duplicate_groups,
                self.summary.reclaimable_display()
            )
        }
    }
}
