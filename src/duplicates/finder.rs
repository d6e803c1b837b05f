//! Fingerprint engine: structural pruning, leaf hashing and composite hashing.
//!
//! # Overview
//!
//! Finding duplicates runs in three passes over a scanned [`Tree`]:
//! 1. **Pruning**: every node gets a [`StructuralKey`]; only nodes whose key
//!    is shared with another node can be duplicates. Skipped when filters
//!    are configured, since a filter can make files of different raw size
//!    produce equal output.
//! 2. **Leaf hashing**: each regular file under a surviving node is read once
//!    (in path order, through the configured filters for its extension) and
//!    its digest is stored in the leaf table keyed by path.
//! 3. **Composite hashing**: each surviving node is hashed. Files take their
//!    digest from the leaf table; directories hash one line per child made
//!    of the child's hash padded to [`HASH_FIELD_WIDTH`] and the child's name.
//!
//! # Example
//!
//! ```no_run
//! use treedupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let result = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//! for (hash, members) in result.registry.groups_by_descending_waste(&result.tree) {
//!     println!("{hash}: {} copies", members.len());
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::Registry;
use crate::progress::{Phase, ProgressSink};
use crate::scanner::{
    pipe, ByteStream, ChildOrder, ContentHash, ExitWatch, FilterError, Hash, HashAlgorithm,
    NodeId, NodeKind, ScanError, ScanOptions, StructuralKey, Tree,
};

/// Width the child hash is left-padded to in a directory listing line.
pub const HASH_FIELD_WIDTH: usize = 80;

/// Filter commands per file extension, applied in list order.
///
/// Files without an extension use the `""` entry.
pub type FilterTable = BTreeMap<String, Vec<String>>;

/// Configuration for the fingerprint engine and the finder around it.
#[derive(Clone)]
pub struct FinderConfig {
    /// Filter commands keyed by extension.
    pub filters: FilterTable,
    /// Digest algorithm for all content hashes.
    pub algorithm: HashAlgorithm,
    /// Number of threads reading leaf files (default: 1).
    pub io_threads: usize,
    /// Snapshot construction options.
    pub scan_options: ScanOptions,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("filters", &self.filters)
            .field("algorithm", &self.algorithm)
            .field("io_threads", &self.io_threads)
            .field("scan_options", &self.scan_options)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            filters: FilterTable::new(),
            algorithm: HashAlgorithm::default(),
            io_threads: 1,
            scan_options: ScanOptions::default(),
            shutdown_flag: None,
            progress: None,
        }
    }
}

impl FinderConfig {
    /// Replace the filter table.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterTable) -> Self {
        self.filters = filters;
        self
    }

    /// Append one filter command for an extension.
    #[must_use]
    pub fn with_filter(mut self, extension: impl Into<String>, command: impl Into<String>) -> Self {
        self.filters
            .entry(extension.into())
            .or_default()
            .push(command.into());
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the number of leaf-reading threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the directory child order.
    #[must_use]
    pub fn with_child_order(mut self, order: ChildOrder) -> Self {
        self.scan_options = self.scan_options.with_child_order(order);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that can occur while fingerprinting.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// A tree snapshot could not be built.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A filter command could not be run.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The node's content depends on a file that could not be read earlier.
    #[error("Content of {0} is unavailable because a file in it could not be read")]
    Unreadable(PathBuf),
}

impl FinderError {
    /// Whether the error only affects one node and the run can go on.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Unreadable(_))
    }
}

/// Counters from a leaf hashing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafStats {
    /// Distinct files read
    pub files: usize,
    /// Raw bytes those files hold
    pub bytes: u64,
    /// Files that could not be read
    pub failed: usize,
    /// Files whose filter exited with a nonzero status
    pub filter_failures: usize,
}

struct LeafDigest {
    digest: Hash,
    filter_failed: bool,
}

/// Build one line of a directory's content.
#[must_use]
pub fn directory_line(child: &ContentHash, name: &OsStr) -> Vec<u8> {
    let mut line = format!("{:<width$} ", child.to_string(), width = HASH_FIELD_WIDTH).into_bytes();
    line.extend_from_slice(name.as_encoded_bytes());
    line.push(b'\n');
    line
}

/// The fingerprint engine and its leaf table.
pub struct Fingerprinter {
    config: FinderConfig,
    /// `None` marks a file that failed to read.
    leaf_hashes: HashMap<PathBuf, Option<Hash>>,
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("config", &self.config)
            .field("leaf_hashes", &self.leaf_hashes.len())
            .finish()
    }
}

impl Fingerprinter {
    /// Create an engine with an empty leaf table.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            leaf_hashes: HashMap::new(),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Stored digest for a file path, if it was read successfully.
    #[must_use]
    pub fn leaf_hash(&self, path: &Path) -> Option<&Hash> {
        self.leaf_hashes.get(path).and_then(Option::as_ref)
    }

    /// Keep the nodes whose structural key is shared with at least one other node.
    ///
    /// Input order is preserved.
    #[must_use]
    pub fn prune(&self, tree: &Tree, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut counts: HashMap<StructuralKey, usize> = HashMap::new();
        for &id in nodes {
            *counts.entry(tree.key(id)).or_default() += 1;
        }
        nodes
            .iter()
            .copied()
            .filter(|&id| counts.get(&tree.key(id)).is_some_and(|&n| n > 1))
            .collect()
    }

    /// Every node under the tree's roots that may have a duplicate.
    ///
    /// Returns the candidates and whether pruning was applied.
    #[must_use]
    pub fn candidates(&self, tree: &Tree) -> (Vec<NodeId>, bool) {
        let all: Vec<NodeId> = tree
            .roots()
            .iter()
            .flat_map(|&root| tree.flatten(root))
            .collect();
        if self.config.filters.is_empty() {
            (self.prune(tree, &all), true)
        } else {
            log::debug!("Filters configured, structural pruning disabled");
            (all, false)
        }
    }

    /// Read and digest every regular file under `nodes` into the leaf table.
    ///
    /// Files are deduplicated by path and processed in path order. A file
    /// that cannot be read is logged and marked failed; the nodes containing
    /// it are skipped by [`Fingerprinter::hash_all`].
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] when the shutdown flag is raised
    /// and [`FinderError::Filter`] when a filter cannot be run.
    pub fn hash_leaves(&mut self, tree: &Tree, nodes: &[NodeId]) -> Result<LeafStats, FinderError> {
        let mut files: BTreeMap<std::ffi::OsString, (PathBuf, String, u64)> = BTreeMap::new();
        for &node in nodes {
            for id in tree.flatten(node) {
                if tree.kind(id) == NodeKind::File {
                    let path = tree.path(id);
                    files
                        .entry(path.clone().into_os_string())
                        .or_insert_with(|| (path, tree.extension(id), tree.size(id)));
                }
            }
        }
        let files: Vec<(PathBuf, String, u64)> = files.into_values().collect();

        let mut stats = LeafStats {
            files: files.len(),
            bytes: files.iter().map(|(_, _, size)| size).sum(),
            ..LeafStats::default()
        };

        log::info!(
            "Hashing {} files ({})",
            stats.files,
            ByteSize::b(stats.bytes)
        );
        if let Some(sink) = &self.config.progress {
            sink.on_phase_start(Phase::Hashing, stats.bytes);
        }

        let hash_one = |(path, ext, _size): (PathBuf, String, u64)| {
            if self.config.is_shutdown_requested() {
                return (path, Err(FinderError::Interrupted));
            }
            if let Some(sink) = &self.config.progress {
                sink.on_file(&path);
            }
            let result = self.digest_leaf(&path, &ext);
            (path, result)
        };

        let results: Vec<(PathBuf, Result<LeafDigest, FinderError>)> =
            if self.config.io_threads > 1 {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.io_threads)
                    .build()
                {
                    Ok(pool) => pool.install(|| files.into_par_iter().map(hash_one).collect()),
                    Err(e) => {
                        log::warn!("Failed to create hashing thread pool ({e}), hashing sequentially");
                        files.into_iter().map(hash_one).collect()
                    }
                }
            } else {
                files.into_iter().map(hash_one).collect()
            };

        if let Some(sink) = &self.config.progress {
            sink.on_phase_end(Phase::Hashing);
        }

        if self.config.is_shutdown_requested() {
            log::info!("Leaf hashing interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }

        for (path, result) in results {
            match result {
                Ok(leaf) => {
                    if leaf.filter_failed {
                        stats.filter_failures += 1;
                    }
                    self.leaf_hashes.insert(path, Some(leaf.digest));
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("{e}");
                    stats.failed += 1;
                    self.leaf_hashes.insert(path, None);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!(
            "Leaf hashing complete: {} read, {} failed, {} filter failures",
            stats.files - stats.failed,
            stats.failed,
            stats.filter_failures
        );
        Ok(stats)
    }

    /// Hash every node in `nodes`, memoising directory hashes for the pass.
    ///
    /// Nodes whose content cannot be produced are logged and left out; their
    /// number is returned alongside the hashes.
    ///
    /// # Errors
    ///
    /// Propagates errors that are not recoverable per node.
    pub fn hash_all(
        &self,
        tree: &Tree,
        nodes: &[NodeId],
    ) -> Result<(Vec<(NodeId, ContentHash)>, usize), FinderError> {
        let mut memo = HashMap::new();
        let mut hashes = Vec::with_capacity(nodes.len());
        let mut skipped = 0;
        for &id in nodes {
            match self.hash_memo(tree, id, &mut memo) {
                Ok(hash) => hashes.push((id, hash)),
                Err(e) if e.is_recoverable() => {
                    log::debug!("Skipping {}: {}", tree.path(id).display(), e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok((hashes, skipped))
    }

    /// Content hash of a single node.
    ///
    /// Files missing from the leaf table are read on demand.
    ///
    /// # Errors
    ///
    /// Fails when a file in the node cannot be read or a filter cannot run.
    pub fn hash(&self, tree: &Tree, id: NodeId) -> Result<ContentHash, FinderError> {
        self.hash_memo(tree, id, &mut HashMap::new())
    }

    /// Re-read every file under `id`, replace their leaf table entries and
    /// hash the node again.
    ///
    /// # Errors
    ///
    /// Returns the first read error after all files were attempted, or a
    /// fatal filter error immediately.
    pub fn rehash(&mut self, tree: &Tree, id: NodeId) -> Result<ContentHash, FinderError> {
        let files: Vec<(PathBuf, String)> = tree
            .flatten(id)
            .filter(|&f| tree.kind(f) == NodeKind::File)
            .map(|f| (tree.path(f), tree.extension(f)))
            .collect();

        if let Some(sink) = &self.config.progress {
            sink.on_phase_start(Phase::Verifying, tree.size(id));
        }
        let mut first_error = None;
        for (path, ext) in files {
            if let Some(sink) = &self.config.progress {
                sink.on_file(&path);
            }
            match self.digest_leaf(&path, &ext) {
                Ok(leaf) => {
                    self.leaf_hashes.insert(path, Some(leaf.digest));
                }
                Err(e) if e.is_recoverable() => {
                    self.leaf_hashes.insert(path, None);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    if let Some(sink) = &self.config.progress {
                        sink.on_phase_end(Phase::Verifying);
                    }
                    return Err(e);
                }
            }
        }
        if let Some(sink) = &self.config.progress {
            sink.on_phase_end(Phase::Verifying);
        }

        match first_error {
            Some(e) => Err(e),
            None => self.hash(tree, id),
        }
    }

    /// Content stream of a node.
    ///
    /// Files yield their bytes (through filters), directories their listing
    /// lines, symlinks their target and everything else nothing.
    ///
    /// # Errors
    ///
    /// Fails when a filter cannot be launched or a child hash is unavailable.
    pub fn content(&self, tree: &Tree, id: NodeId) -> Result<ByteStream, FinderError> {
        match tree.kind(id) {
            NodeKind::File => {
                let (stream, _) = self.leaf_stream(&tree.path(id), &tree.extension(id))?;
                Ok(stream)
            }
            NodeKind::Directory => {
                let lines = self.directory_lines(tree, id, &mut HashMap::new())?;
                Ok(ByteStream::new(lines.into_iter().map(Ok)))
            }
            _ => Ok(Self::plain_content(tree, id)),
        }
    }

    fn plain_content(tree: &Tree, id: NodeId) -> ByteStream {
        match tree.target(id) {
            Some(target) => ByteStream::from_bytes(target.as_os_str().as_encoded_bytes().to_vec()),
            None => ByteStream::empty(),
        }
    }

    fn hash_memo(
        &self,
        tree: &Tree,
        id: NodeId,
        memo: &mut HashMap<NodeId, Option<ContentHash>>,
    ) -> Result<ContentHash, FinderError> {
        if let Some(known) = memo.get(&id) {
            return known.ok_or_else(|| FinderError::Unreadable(tree.path(id)));
        }
        let result = self.compute_hash(tree, id, memo);
        match &result {
            Ok(hash) => {
                memo.insert(id, Some(*hash));
            }
            Err(e) if e.is_recoverable() => {
                memo.insert(id, None);
            }
            Err(_) => {}
        }
        result
    }

    fn compute_hash(
        &self,
        tree: &Tree,
        id: NodeId,
        memo: &mut HashMap<NodeId, Option<ContentHash>>,
    ) -> Result<ContentHash, FinderError> {
        let kind = tree.kind(id);
        let digest = match kind {
            NodeKind::File => self.file_digest(tree, id)?,
            NodeKind::Directory => {
                let lines = self.directory_lines(tree, id, memo)?;
                self.digest(&tree.path(id), ByteStream::new(lines.into_iter().map(Ok)))?
            }
            _ => self.digest(&tree.path(id), Self::plain_content(tree, id))?,
        };
        Ok(ContentHash::new(digest, kind))
    }

    fn directory_lines(
        &self,
        tree: &Tree,
        id: NodeId,
        memo: &mut HashMap<NodeId, Option<ContentHash>>,
    ) -> Result<Vec<Vec<u8>>, FinderError> {
        tree.children(id)
            .iter()
            .map(|&child| {
                let hash = self.hash_memo(tree, child, memo)?;
                Ok(directory_line(&hash, tree.name(child)))
            })
            .collect()
    }

    fn file_digest(&self, tree: &Tree, id: NodeId) -> Result<Hash, FinderError> {
        let path = tree.path(id);
        match self.leaf_hashes.get(&path) {
            Some(Some(hash)) => Ok(*hash),
            Some(None) => Err(FinderError::Unreadable(path)),
            None => Ok(self.digest_leaf(&path, &tree.extension(id))?.digest),
        }
    }

    fn digest(&self, path: &Path, stream: ByteStream) -> Result<Hash, FinderError> {
        stream
            .digest(self.config.algorithm)
            .map_err(|source| FinderError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Raw file bytes, reported to the progress sink, then through each filter.
    fn leaf_stream(&self, path: &Path, ext: &str) -> Result<(ByteStream, Vec<ExitWatch>), FilterError> {
        let mut stream = ByteStream::from_file(path);
        if let Some(sink) = &self.config.progress {
            let sink = Arc::clone(sink);
            stream = stream.observe(move |n| sink.on_bytes(n as u64));
        }
        let mut watches = Vec::new();
        for command in self.config.filters.get(ext).into_iter().flatten() {
            let piped = pipe(stream, command)?;
            watches.push(piped.exit_watch());
            stream = piped.into_stream();
        }
        Ok((stream, watches))
    }

    fn digest_leaf(&self, path: &Path, ext: &str) -> Result<LeafDigest, FinderError> {
        let (stream, watches) = self.leaf_stream(path, ext)?;
        let digest = self.digest(path, stream)?;
        let mut filter_failed = false;
        for watch in &watches {
            if let Some(failure) = watch.failure() {
                if failure.is_not_runnable() {
                    return Err(failure.clone().into_error().into());
                }
                filter_failed = true;
            }
        }
        Ok(LeafDigest {
            digest,
            filter_failed,
        })
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Nodes under all roots, directories included
    pub total_entries: u64,
    /// Total size of all roots in bytes
    pub total_size: u64,
    /// Whether structural pruning ran
    pub pruned: bool,
    /// Nodes that survived pruning
    pub candidates: usize,
    /// Leaf hashing counters
    pub leaves: LeafStats,
    /// Candidates left out because their content could not be read
    pub skipped_nodes: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Sum of the duplicated bytes of all groups
    pub reclaimable_space: u64,
    /// Duration of the whole run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    /// Format the amount of data to hash as human-readable string.
    #[must_use]
    pub fn hash_size_display(&self) -> String {
        ByteSize::b(self.leaves.bytes).to_string()
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }
}

/// Everything a finished scan hands to the reporting and resolution stages.
#[derive(Debug)]
pub struct ScanResult {
    /// Snapshot of all roots
    pub tree: Tree,
    /// Engine with a populated leaf table, used again for reverification
    pub fingerprinter: Fingerprinter,
    /// Candidates grouped by content hash
    pub registry: Registry,
    /// Counters for the scan
    pub summary: ScanSummary,
}

/// Resolve `path` for overlap checks without following a final symlink.
///
/// Falls back to the path as given when it cannot be resolved, leaving
/// the error to the scan.
fn normalize_root(path: &Path) -> PathBuf {
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            parent.canonicalize().map(|p| p.join(name))
        }
        (_, Some(name)) => std::env::current_dir().map(|cwd| cwd.join(name)),
        _ => path.canonicalize(),
    };
    resolved.unwrap_or_else(|_| path.to_path_buf())
}

/// Roots that neither repeat nor sit inside another root, in input order.
///
/// Scanning one entry twice would register it as its own duplicate.
fn distinct_roots(paths: &[PathBuf]) -> Vec<&PathBuf> {
    let normalized: Vec<PathBuf> = paths.iter().map(|p| normalize_root(p)).collect();
    paths
        .iter()
        .enumerate()
        .filter(|&(i, path)| {
            let covered = normalized.iter().enumerate().any(|(j, other)| {
                j != i
                    && normalized[i].starts_with(other)
                    && (normalized[i] != *other || j < i)
            });
            if covered {
                log::warn!(
                    "Skipping {}: already covered by another scan root",
                    path.display()
                );
            }
            !covered
        })
        .map(|(_, path)| path)
        .collect()
}

/// Orchestrates a full run: scan, prune, hash, register.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Scan `paths` into one arena and find duplicate nodes across them.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Scan`] if any path cannot be snapshotted,
    /// [`FinderError::Filter`] if a filter cannot be run and
    /// [`FinderError::Interrupted`] if the shutdown flag is raised.
    pub fn find_duplicates(self, paths: &[PathBuf]) -> Result<ScanResult, FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        let mut tree = Tree::new(self.config.scan_options.clone());
        if let Some(sink) = &self.config.progress {
            sink.on_phase_start(Phase::Scanning, 0);
        }
        for path in distinct_roots(paths) {
            if let Some(sink) = &self.config.progress {
                sink.on_file(path);
            }
            let scanned = tree.scan(path);
            if scanned.is_err() {
                if let Some(sink) = &self.config.progress {
                    sink.on_phase_end(Phase::Scanning);
                }
            }
            let root = scanned?;
            summary.total_entries += tree.count(root);
            summary.total_size += tree.size(root);
        }
        if let Some(sink) = &self.config.progress {
            sink.on_phase_end(Phase::Scanning);
        }
        log::info!(
            "Found {} files, {}",
            summary.total_entries,
            summary.total_size_display()
        );

        let mut fingerprinter = Fingerprinter::new(self.config);
        let (candidates, pruned) = fingerprinter.candidates(&tree);
        summary.pruned = pruned;
        summary.candidates = candidates.len();
        log::info!("{} possible duplicates", candidates.len());

        summary.leaves = fingerprinter.hash_leaves(&tree, &candidates)?;
        let (hashes, skipped) = fingerprinter.hash_all(&tree, &candidates)?;
        summary.skipped_nodes = skipped;

        let mut registry = Registry::new();
        for (id, hash) in hashes {
            registry.register(id, hash);
        }

        let groups = registry.groups_by_descending_waste(&tree);
        summary.duplicate_groups = groups.len();
        summary.reclaimable_space = groups
            .iter()
            .map(|(hash, _)| registry.duplicated_bytes(hash, &tree))
            .sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Found {} duplicate groups, {} reclaimable",
            summary.duplicate_groups,
            summary.reclaimable_display()
        );

        Ok(ScanResult {
            tree,
            fingerprinter,
            registry,
            summary,
        })
    }
}
