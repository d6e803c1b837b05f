//! File actions module.
//!
//! Removal of snapshot nodes, either unlinked for good (directories
//! depth-first) or moved to the system trash.
//!
//! ```no_run
//! use treedupe::actions::{delete_node, DeleteConfig};
//! use treedupe::scanner::{ScanOptions, Tree};
//! use std::path::Path;
//!
//! let mut tree = Tree::new(ScanOptions::default());
//! let node = tree.scan(Path::new("/tmp/duplicate.txt")).unwrap();
//! let removed = delete_node(&tree, node, &DeleteConfig::trash(), &mut |_| {}).unwrap();
//! ```

pub mod delete;

// Re-export commonly used types
pub use delete::{delete_node, DeleteConfig, DeleteError, DeleteResult};
