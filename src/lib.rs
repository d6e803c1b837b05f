//! treedupe - duplicate file and directory-tree finder
//!
//! Snapshots one or more paths, groups files *and directories* whose
//! content is identical, and lets the user reclaim the wasted space
//! interactively or exports a report.
//!
//! A directory's content is the list of its children's names and content
//! hashes, so two directories are duplicates exactly when they contain the
//! same names with the same contents, recursively. Files can be piped
//! through per-extension filter commands before hashing, so that for
//! example audio files differing only in their tags compare equal.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod interactive;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::DeleteConfig;
use crate::cli::{CatArgs, Cli, Commands, OutputFormat, ScanArgs, TreeArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, Fingerprinter, ScanResult};
use crate::error::ExitCode;
use crate::interactive::{
    ConsoleObserver, DialoguerChooser, LineChooser, ResolveError, Resolver, State,
};
use crate::output::{report_groups, CsvOutput, JsonOutput, TextOutput, TreeDump};
use crate::progress::{Progress, ProgressSink};
use crate::scanner::{ScanOptions, Tree};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns any error that ends the run; use [`ExitCode::for_error`] to pick
/// the process exit code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Scan(args) => {
            config.apply_scan_args(&args);
            run_scan(&args, &config, cli.quiet)
        }
        Commands::Cat(args) => {
            config.apply_hashing_args(&args.hashing);
            run_cat(&args, &config)
        }
        Commands::Tree(args) => {
            if let Some(order) = args.child_order {
                config.child_order = order.into();
            }
            run_tree(&args, &config)
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let handler = signal::install_handler()?;
    let progress: Arc<dyn ProgressSink> = Arc::new(Progress::new(quiet));
    let finder_config = config
        .finder_config()
        .with_shutdown_flag(handler.get_flag())
        .with_progress(progress);

    // Machine-readable formats keep stdout clean.
    let chatty = !quiet && matches!(args.output, OutputFormat::Interactive | OutputFormat::Text);
    if chatty {
        println!("scanning directory tree...");
    }

    let ScanResult {
        mut tree,
        mut fingerprinter,
        mut registry,
        summary,
    } = DuplicateFinder::new(finder_config)
        .find_duplicates(&args.paths)
        .context("Scan failed")?;

    if chatty {
        println!(
            "found {} files, {}",
            summary.total_entries,
            summary.total_size_display()
        );
        println!("{} possible duplicates", summary.candidates);
        println!("scanned {}", summary.hash_size_display());
        if summary.leaves.failed > 0 || summary.leaves.filter_failures > 0 {
            println!(
                "{} files could not be read, {} filters failed",
                summary.leaves.failed.yellow(),
                summary.leaves.filter_failures.yellow()
            );
        }
    }

    let exit_code = if summary.duplicate_groups == 0 {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    };

    let stdout = io::stdout();
    match args.output {
        OutputFormat::Text => {
            let groups = report_groups(&tree, &registry, args.limit);
            TextOutput::new(&groups, &summary).write_to(&mut stdout.lock())?;
        }
        OutputFormat::Json => {
            let groups = report_groups(&tree, &registry, args.limit);
            JsonOutput::new(&groups, &summary, exit_code).write_to(&mut stdout.lock(), true)?;
        }
        OutputFormat::Csv => {
            let groups = report_groups(&tree, &registry, args.limit);
            CsvOutput::new(&groups).write_to(stdout.lock())?;
        }
        OutputFormat::Interactive => {
            if summary.duplicate_groups == 0 {
                if !quiet {
                    println!("no duplicates found");
                }
                return Ok(exit_code);
            }
            println!(
                "{} duplicate groups, {} reclaimable",
                summary.duplicate_groups,
                summary.reclaimable_display().bold()
            );

            let delete_config = DeleteConfig {
                use_trash: config.use_trash,
            };
            let mut resolver =
                Resolver::new(&mut tree, &mut fingerprinter, &mut registry, delete_config);
            let mut observer = ConsoleObserver;
            let outcome = if io::stdin().is_terminal() {
                resolver.run(&mut DialoguerChooser, &mut observer)
            } else {
                let mut chooser = LineChooser::new(io::stdin().lock(), io::stdout());
                resolver.run(&mut chooser, &mut observer)
            };
            match outcome {
                Ok(_) => {}
                Err(ResolveError::EndOfInput) => {
                    log::warn!("Input ended before all groups were resolved");
                }
                Err(e) => return Err(e.into()),
            }

            let stats = resolver.stats();
            println!(
                "{} entries deleted, {} freed",
                stats.entries_deleted,
                ByteSize::b(stats.bytes_freed)
            );
            if stats.delete_failures > 0 {
                println!("{} members could not be deleted", stats.delete_failures.red());
            }
            if resolver.state() == State::Quit {
                log::debug!("{} groups left unresolved", resolver.pending().len());
            }
        }
    }

    Ok(exit_code)
}

fn run_cat(args: &CatArgs, config: &Config) -> Result<ExitCode> {
    let mut tree = Tree::new(ScanOptions::default().with_child_order(config.child_order));
    let fingerprinter = Fingerprinter::new(config.finder_config());
    let mut out = io::stdout().lock();
    for path in &args.paths {
        let id = tree
            .scan(path)
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        let stream = fingerprinter.content(&tree, id)?;
        stream
            .write_to(&mut out)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    out.flush()?;
    Ok(ExitCode::Success)
}

fn run_tree(args: &TreeArgs, config: &Config) -> Result<ExitCode> {
    let mut tree = Tree::new(ScanOptions::default().with_child_order(config.child_order));
    let mut out = io::stdout().lock();
    for path in &args.paths {
        let id = tree
            .scan(path)
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        TreeDump::new(&tree).write_to(&mut out, id)?;
    }
    out.flush()?;
    Ok(ExitCode::Success)
}
