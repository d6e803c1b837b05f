//! Command-line interface definitions for treedupe.
//!
//! Global options (verbosity, color, config file) apply to every
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Find duplicate files and directories, then resolve them interactively
//! treedupe scan ~/Music /mnt/backup/Music
//!
//! # Compare PDFs by their text rather than their bytes
//! treedupe scan ~/papers --filter 'pdf:pdftotext - -'
//!
//! # Report the ten most wasteful groups as JSON
//! treedupe scan ~/Downloads --output json --limit 10
//!
//! # Show what a directory hashes to, and its layout
//! treedupe cat ~/photos | sha256sum
//! treedupe tree ~/photos
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{ChildOrder, HashAlgorithm};

/// Find duplicate files and directory trees and reclaim the space they use.
///
/// Directories are compared by content: two directories are duplicates when
/// they hold the same names with the same contents, recursively.
#[derive(Debug, Parser)]
#[command(name = "treedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: the platform config directory)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for treedupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan paths for duplicate files and directories
    Scan(ScanArgs),
    /// Write the byte stream a path is hashed from to stdout
    Cat(CatArgs),
    /// Print a path as a tree with kinds, sizes and link targets
    Tree(TreeArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Options shared by every subcommand that hashes content.
#[derive(Debug, Clone, Default, Args)]
pub struct HashingArgs {
    /// Pipe files with extension EXT through COMMAND before hashing
    ///
    /// Repeatable; commands for the same extension run in order, after
    /// the ones from the configuration file. COMMAND runs through the shell.
    #[arg(long = "filter", value_name = "EXT:COMMAND", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Hash algorithm
    #[arg(long = "hash", value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<HashAlgorithmArg>,

    /// Directory listing order used for hashing
    #[arg(long, value_enum)]
    pub child_order: Option<ChildOrderArg>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Paths to scan; all of them are compared against each other
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// What to do with the duplicates found
    #[arg(short, long, value_enum, default_value = "interactive")]
    pub output: OutputFormat,

    /// Report at most N groups (largest waste first)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Move deleted entries to the system trash instead of unlinking them
    #[arg(long)]
    pub trash: bool,

    /// Number of threads reading files in parallel (1 keeps reads in path order)
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Arguments for the cat subcommand.
#[derive(Debug, Args)]
pub struct CatArgs {
    /// Paths whose content streams are written, one after another
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Arguments for the tree subcommand.
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Paths to print
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Directory listing order
    #[arg(long, value_enum)]
    pub child_order: Option<ChildOrderArg>,
}

/// What the scan subcommand does with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Review groups one by one and choose what to delete
    Interactive,
    /// Plain text report
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Interactive => write!(f, "interactive"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Digest algorithm as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HashAlgorithmArg {
    /// BLAKE3
    Blake3,
    /// SHA-256
    Sha256,
}

impl From<HashAlgorithmArg> for HashAlgorithm {
    fn from(arg: HashAlgorithmArg) -> Self {
        match arg {
            HashAlgorithmArg::Blake3 => HashAlgorithm::Blake3,
            HashAlgorithmArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

/// Directory listing order as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChildOrderArg {
    /// Sorted by entry name
    Name,
    /// OS enumeration order
    Native,
}

impl From<ChildOrderArg> for ChildOrder {
    fn from(arg: ChildOrderArg) -> Self {
        match arg {
            ChildOrderArg::Name => ChildOrder::Name,
            ChildOrderArg::Native => ChildOrder::Native,
        }
    }
}

/// Parse an `EXT:COMMAND` filter specification.
///
/// The extension is matched without its leading dot and is stored without
/// one; an empty extension selects files that have none.
///
/// # Examples
///
/// ```
/// use treedupe::cli::parse_filter;
///
/// assert_eq!(
///     parse_filter("pdf:pdftotext - -").unwrap(),
///     ("pdf".to_string(), "pdftotext - -".to_string())
/// );
/// assert!(parse_filter("no-colon").is_err());
/// ```
pub fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (ext, command) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected EXT:COMMAND, got '{s}'"))?;
    let ext = ext.trim().trim_start_matches('.');
    let command = command.trim();
    if command.is_empty() {
        return Err(format!("Filter for '{ext}' has an empty command"));
    }
    Ok((ext.to_string(), command.to_string()))
}
