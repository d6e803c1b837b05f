//! Scanner module: filesystem tree snapshots and the byte streams read from them.
//!
//! This module provides functionality for:
//! - Building an in-memory snapshot of one or more directory trees
//! - Lazy, chunked byte streams for hashing file content
//! - Piping streams through external filter commands
//! - Content digests (BLAKE3 or SHA-256)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`tree`]: Arena of nodes with parent back-references and structural keys
//! - [`stream`]: Pull-based byte streams and their combinators
//! - [`pipe`]: Concurrent stdin/stdout piping through a child process
//! - [`hasher`]: Digest algorithms and content hash values
//!
//! # Example
//!
//! ```no_run
//! use treedupe::scanner::{Tree, ScanOptions};
//! use std::path::Path;
//!
//! let mut tree = Tree::new(ScanOptions::default());
//! let root = tree.scan(Path::new(".")).unwrap();
//! println!("{} entries, {} bytes", tree.count(root), tree.size(root));
//! ```

pub mod hasher;
pub mod pipe;
pub mod stream;
pub mod tree;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{hash_to_hex, ContentHash, Hash, HashAlgorithm, Hasher};
pub use pipe::{pipe, pipe_command, shell_command, ExitWatch, FilterError, FilterFailure, PipeStream};
pub use stream::{ByteStream, CHUNK_SIZE};
pub use tree::{ChildOrder, Flatten, NodeId, ScanOptions, StructuralKey, Tree};

/// Kind of a filesystem entry.
///
/// The set is closed: anything the OS reports outside of it is rejected
/// with [`ScanError::UnsupportedFileType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    Symlink,
    /// Named pipe
    Fifo,
    /// Character device
    CharDevice,
    /// Block device
    BlockDevice,
    /// Unix domain socket
    Socket,
    /// Entry whose type the platform cannot name
    Unknown,
}

impl NodeKind {
    /// Short name used in content hashes and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "dir",
            Self::Symlink => "link",
            Self::Fifo => "fifo",
            Self::CharDevice => "char",
            Self::BlockDevice => "block",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building a tree snapshot.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The OS reported an entry type outside the supported set.
    #[error("Unsupported file type at {path}: {description}")]
    UnsupportedFileType {
        /// Path of the offending entry
        path: PathBuf,
        /// Debug rendering of the reported type
        description: String,
    },

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while accessing an entry.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }

    /// Whether the error means the entry is simply gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
