//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Structural-key pruning of candidate nodes
//! - Leaf hashing (optionally through filter commands) and composite hashing
//! - The duplicate registry with space accounting and reverification

pub mod finder;
pub mod groups;

pub use finder::{
    directory_line, DuplicateFinder, FilterTable, FinderConfig, FinderError, Fingerprinter,
    LeafStats, ScanResult, ScanSummary, HASH_FIELD_WIDTH,
};
pub use groups::{Registry, ReverifyEvent};
