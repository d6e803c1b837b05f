//! Deletion of snapshot nodes.
//!
//! # Overview
//!
//! [`delete_node`] removes the entry behind a [`Tree`] node:
//! - directories are emptied child by child (as recorded in the snapshot),
//!   then removed with `remove_dir`, which fails if the directory gained
//!   entries the snapshot does not know about;
//! - every other kind, symlinks included, is unlinked; links are never
//!   followed.
//!
//! With [`DeleteConfig::use_trash`] the node is moved to the system trash
//! in one step instead.
//!
//! Every removed entry is reported to the caller's callback as it happens.
//!
//! # Example
//!
//! ```no_run
//! use treedupe::actions::delete::{delete_node, DeleteConfig};
//! use treedupe::scanner::{ScanOptions, Tree};
//! use std::path::Path;
//!
//! let mut tree = Tree::new(ScanOptions::default());
//! let node = tree.scan(Path::new("/tmp/copy")).unwrap();
//! delete_node(&tree, node, &DeleteConfig::default(), &mut |r| {
//!     println!("deleted {} ({})", r.path.display(), r.kind);
//! })
//! .unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scanner::{NodeId, NodeKind, Tree};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Entry was not found (may have been deleted or moved).
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// Entry that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Entry that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// One removed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was removed.
    pub path: PathBuf,
    /// Kind of entry that was removed.
    pub kind: NodeKind,
    /// Size recorded for the entry in the snapshot.
    pub size: u64,
    /// Whether the entry went to the trash rather than being unlinked.
    pub trashed: bool,
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, Default)]
pub struct DeleteConfig {
    /// Move entries to the system trash instead of removing them.
    pub use_trash: bool,
}

impl DeleteConfig {
    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self { use_trash: true }
    }
}

/// Delete the entry behind `id` and report every removed entry.
///
/// Returns the removed entries in removal order (children before their
/// directory).
///
/// # Errors
///
/// Stops at the first entry that cannot be removed. Entries removed before
/// the failure stay removed and have already been reported.
pub fn delete_node(
    tree: &Tree,
    id: NodeId,
    config: &DeleteConfig,
    on_deleted: &mut dyn FnMut(&DeleteResult),
) -> Result<Vec<DeleteResult>, DeleteError> {
    let mut removed = Vec::new();
    if config.use_trash {
        let path = tree.path(id);
        trash::delete(&path).map_err(|e| {
            log::error!("Trash operation failed for {}: {}", path.display(), e);
            DeleteError::TrashFailed {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        let result = DeleteResult {
            path,
            kind: tree.kind(id),
            size: tree.size(id),
            trashed: true,
        };
        log::info!("Moved to trash: {}", result.path.display());
        on_deleted(&result);
        removed.push(result);
    } else {
        remove_recursive(tree, id, &mut removed, on_deleted)?;
    }
    Ok(removed)
}

fn remove_recursive(
    tree: &Tree,
    id: NodeId,
    removed: &mut Vec<DeleteResult>,
    on_deleted: &mut dyn FnMut(&DeleteResult),
) -> Result<(), DeleteError> {
    let path = tree.path(id);
    let kind = tree.kind(id);
    if kind == NodeKind::Directory {
        for &child in tree.children(id) {
            remove_recursive(tree, child, removed, on_deleted)?;
        }
        fs::remove_dir(&path).map_err(|e| DeleteError::from_io(&path, e))?;
    } else {
        fs::remove_file(&path).map_err(|e| DeleteError::from_io(&path, e))?;
    }

    log::debug!("Deleted {} ({})", path.display(), kind);
    let result = DeleteResult {
        path,
        kind,
        size: tree.size(id),
        trashed: false,
    };
    on_deleted(&result);
    removed.push(result);
    Ok(())
}
