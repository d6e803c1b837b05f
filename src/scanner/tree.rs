//! In-memory snapshot of filesystem trees.
//!
//! # Overview
//!
//! A [`Tree`] is an arena of nodes addressed by [`NodeId`]. Each node knows
//! its name, its parent (by index) and, for directories, its children. Sizes
//! and descendant counts are computed bottom-up once, while the snapshot is
//! built, so [`Tree::size`], [`Tree::count`] and [`Tree::key`] are O(1).
//!
//! Nodes never change after construction. To observe the disk again, call
//! [`Tree::rebuild`], which appends a fresh snapshot of the entry to the
//! arena and re-points the parent's child slot at it. The old node stays
//! in the arena but is no longer reachable from the roots.
//!
//! Symbolic links are recorded with their target and never followed.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{NodeKind, ScanError};

/// Index of a node in a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Order in which a directory's children are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildOrder {
    /// Sorted by the raw bytes of the entry name
    #[default]
    Name,
    /// Whatever order the OS enumerates entries in
    Native,
}

/// Options controlling snapshot construction.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Order of directory children
    pub child_order: ChildOrder,
}

impl ScanOptions {
    /// Set the child order.
    #[must_use]
    pub fn with_child_order(mut self, child_order: ChildOrder) -> Self {
        self.child_order = child_order;
        self
    }
}

/// Cheap, content-independent summary of a node.
///
/// Two nodes with different keys cannot have equal content hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructuralKey {
    /// Regular file of the given size
    File {
        /// File size in bytes
        size: u64,
    },
    /// Directory summary
    Directory {
        /// Recursive size in bytes
        size: u64,
        /// Number of immediate children
        children: usize,
        /// Number of nodes in the subtree, including the directory itself
        descendants: u64,
    },
    /// Symbolic link and its target
    Symlink {
        /// Link target as stored on disk
        target: PathBuf,
    },
    /// Any other kind; only the kind itself is known
    Other(NodeKind),
}

#[derive(Debug)]
struct Node {
    name: OsString,
    parent: Option<NodeId>,
    kind: NodeKind,
    size: u64,
    count: u64,
    target: Option<PathBuf>,
    children: Vec<NodeId>,
}

/// Arena of filesystem snapshots.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    options: ScanOptions,
}

impl Tree {
    /// Create an empty arena.
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            options,
        }
    }

    /// Snapshot the entry at `path` (recursively for directories) as a new root.
    ///
    /// The root's name is the path exactly as given.
    ///
    /// # Errors
    ///
    /// Fails if any entry in the subtree cannot be inspected or has an
    /// unsupported type.
    pub fn scan(&mut self, path: &Path) -> Result<NodeId, ScanError> {
        let id = self.create(path.as_os_str().to_os_string(), None)?;
        self.roots.push(id);
        log::debug!(
            "Scanned {}: {} entries, {} bytes",
            path.display(),
            self.count(id),
            self.size(id)
        );
        Ok(id)
    }

    /// Build a node named `name` under `parent` (or a root when `None`).
    ///
    /// The new node is not linked into the parent's children; callers do that.
    fn create(&mut self, name: OsString, parent: Option<NodeId>) -> Result<NodeId, ScanError> {
        let path = match parent {
            Some(p) => self.path(p).join(&name),
            None => PathBuf::from(&name),
        };
        let meta = fs::symlink_metadata(&path).map_err(|e| ScanError::from_io(path.clone(), e))?;
        let kind = classify(&path, &meta.file_type())?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            parent,
            kind,
            size: 0,
            count: 1,
            target: None,
            children: Vec::new(),
        });

        match kind {
            NodeKind::File => self.nodes[id.0].size = meta.len(),
            NodeKind::Symlink => {
                let target = fs::read_link(&path).map_err(|e| ScanError::from_io(path.clone(), e))?;
                self.nodes[id.0].target = Some(target);
            }
            NodeKind::Directory => {
                let names = self.read_names(&path)?;
                let mut children = Vec::with_capacity(names.len());
                let mut size = 0u64;
                let mut count = 1u64;
                for child_name in names {
                    let child = self.create(child_name, Some(id))?;
                    size += self.nodes[child.0].size;
                    count += self.nodes[child.0].count;
                    children.push(child);
                }
                let node = &mut self.nodes[id.0];
                node.size = size;
                node.count = count;
                node.children = children;
            }
            _ => {}
        }

        Ok(id)
    }

    fn read_names(&self, dir: &Path) -> Result<Vec<OsString>, ScanError> {
        let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;
            names.push(entry.file_name());
        }
        if self.options.child_order == ChildOrder::Name {
            names.sort_by(|a, b| a.as_encoded_bytes().cmp(b.as_encoded_bytes()));
        }
        Ok(names)
    }

    /// Root nodes in scan order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes in the arena, including superseded snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing has been scanned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Path segment (for roots, the path as given).
    #[must_use]
    pub fn name(&self, id: NodeId) -> &OsStr {
        &self.nodes[id.0].name
    }

    /// Containing directory, `None` for roots.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Kind of the entry.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    /// Bytes: file length, recursive sum for directories, 0 otherwise.
    #[must_use]
    pub fn size(&self, id: NodeId) -> u64 {
        self.nodes[id.0].size
    }

    /// 1 for leaves, 1 + the children's counts for directories.
    #[must_use]
    pub fn count(&self, id: NodeId) -> u64 {
        self.nodes[id.0].count
    }

    /// Immediate children in recorded order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Symlink target captured at construction.
    #[must_use]
    pub fn target(&self, id: NodeId) -> Option<&Path> {
        self.nodes[id.0].target.as_deref()
    }

    /// Full path: the parent's path joined with the name.
    #[must_use]
    pub fn path(&self, id: NodeId) -> PathBuf {
        let mut segments = vec![self.name(id)];
        let mut current = self.parent(id);
        while let Some(p) = current {
            segments.push(self.name(p));
            current = self.parent(p);
        }
        segments.iter().rev().collect()
    }

    /// Extension of the node's name, or `""` when it has none.
    #[must_use]
    pub fn extension(&self, id: NodeId) -> String {
        Path::new(self.name(id))
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Structural key of the node.
    #[must_use]
    pub fn key(&self, id: NodeId) -> StructuralKey {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::File => StructuralKey::File { size: node.size },
            NodeKind::Directory => StructuralKey::Directory {
                size: node.size,
                children: node.children.len(),
                descendants: node.count,
            },
            NodeKind::Symlink => StructuralKey::Symlink {
                target: node.target.clone().unwrap_or_default(),
            },
            other => StructuralKey::Other(other),
        }
    }

    /// Pre-order iterator over the node and its descendants.
    pub fn flatten(&self, id: NodeId) -> Flatten<'_> {
        Flatten {
            tree: self,
            stack: vec![id],
        }
    }

    /// Whether something, including a dangling symlink, is present at the path.
    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        fs::symlink_metadata(self.path(id)).is_ok()
    }

    /// Take a fresh snapshot of the entry and put it in the old one's place.
    ///
    /// Ancestors keep their original sizes and counts.
    ///
    /// # Errors
    ///
    /// Fails like [`Tree::scan`]; on error the old snapshot stays in place.
    pub fn rebuild(&mut self, id: NodeId) -> Result<NodeId, ScanError> {
        let name = self.nodes[id.0].name.clone();
        let parent = self.nodes[id.0].parent;
        let fresh = self.create(name, parent)?;

        let slot = match parent {
            Some(p) => self.nodes[p.0].children.iter_mut().find(|c| **c == id),
            None => self.roots.iter_mut().find(|r| **r == id),
        };
        if let Some(slot) = slot {
            *slot = fresh;
        }
        Ok(fresh)
    }
}

/// Map an OS file type onto the closed [`NodeKind`] set.
fn classify(path: &Path, ft: &fs::FileType) -> Result<NodeKind, ScanError> {
    if ft.is_symlink() {
        return Ok(NodeKind::Symlink);
    }
    if ft.is_dir() {
        return Ok(NodeKind::Directory);
    }
    if ft.is_file() {
        return Ok(NodeKind::File);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_fifo() {
            return Ok(NodeKind::Fifo);
        }
        if ft.is_char_device() {
            return Ok(NodeKind::CharDevice);
        }
        if ft.is_block_device() {
            return Ok(NodeKind::BlockDevice);
        }
        if ft.is_socket() {
            return Ok(NodeKind::Socket);
        }
        Err(ScanError::UnsupportedFileType {
            path: path.to_path_buf(),
            description: format!("{ft:?}"),
        })
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(NodeKind::Unknown)
    }
}

/// Pre-order traversal produced by [`Tree::flatten`].
#[derive(Debug)]
pub struct Flatten<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Flatten<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
