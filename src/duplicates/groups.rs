//! Duplicate registry and space accounting.
//!
//! # Overview
//!
//! The [`Registry`] maps each [`ContentHash`] to the nodes that produced it,
//! in registration order. Groups with two or more members are duplicates;
//! [`Registry::groups_by_descending_waste`] lists them with the groups that
//! waste the most space first.
//!
//! Before a group is acted upon, [`Registry::reverify`] checks it against
//! the disk again: members that disappeared are dropped, the rest are
//! rebuilt and re-hashed from fresh reads, and members whose hash changed
//! move to the group for their new hash.
//!
//! # Example
//!
//! ```
//! use treedupe::duplicates::Registry;
//!
//! let registry = Registry::new();
//! assert!(registry.is_empty());
//! ```

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::PathBuf;

use super::finder::{FinderError, Fingerprinter};
use crate::scanner::{ContentHash, NodeId, Tree};

/// Outcome of checking one group member against the disk.
#[derive(Debug)]
pub enum ReverifyEvent {
    /// Nothing exists at the member's path any more.
    Vanished {
        /// Path of the member
        path: PathBuf,
    },
    /// The member's content changed; it now lives in another group.
    Changed {
        /// Path of the member
        path: PathBuf,
        /// Fresh snapshot of the member
        node: NodeId,
        /// Hash of the fresh snapshot
        new_hash: ContentHash,
    },
    /// The member could not be rebuilt or re-read and was dropped.
    Failed {
        /// Path of the member
        path: PathBuf,
        /// What went wrong
        error: FinderError,
    },
}

impl ReverifyEvent {
    /// Path the event is about.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Vanished { path } | Self::Changed { path, .. } | Self::Failed { path, .. } => path,
        }
    }
}

/// Nodes grouped by content hash, in insertion order.
#[derive(Debug, Default)]
pub struct Registry {
    groups: Vec<(ContentHash, Vec<NodeId>)>,
    index: HashMap<ContentHash, usize>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node` to the group for `hash`.
    pub fn register(&mut self, node: NodeId, hash: ContentHash) {
        let slot = *self.index.entry(hash).or_insert_with(|| {
            self.groups.push((hash, Vec::new()));
            self.groups.len() - 1
        });
        self.groups[slot].1.push(node);
    }

    /// Members registered under `hash`.
    #[must_use]
    pub fn members(&self, hash: &ContentHash) -> &[NodeId] {
        self.index
            .get(hash)
            .map_or(&[], |&slot| self.groups[slot].1.as_slice())
    }

    /// Drop every member of the group for `hash`, returning them.
    pub fn remove(&mut self, hash: &ContentHash) -> Vec<NodeId> {
        self.index
            .get(hash)
            .map(|&slot| std::mem::take(&mut self.groups[slot].1))
            .unwrap_or_default()
    }

    /// Whether no node is registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, members)| members.is_empty())
    }

    /// Number of groups with two or more members.
    #[must_use]
    pub fn duplicate_group_count(&self) -> usize {
        self.groups.iter().filter(|(_, m)| m.len() > 1).count()
    }

    /// Bytes that deleting all but one member would free.
    ///
    /// Computed as `total - total / count`, which equals
    /// `size * (count - 1)` when all members have the same size.
    #[must_use]
    pub fn duplicated_bytes(&self, hash: &ContentHash, tree: &Tree) -> u64 {
        let members = self.members(hash);
        if members.is_empty() {
            return 0;
        }
        let total: u64 = members.iter().map(|&id| tree.size(id)).sum();
        total - total / members.len() as u64
    }

    /// Groups with two or more members, most duplicated bytes first.
    ///
    /// Ties keep registration order.
    #[must_use]
    pub fn groups_by_descending_waste(&self, tree: &Tree) -> Vec<(ContentHash, Vec<NodeId>)> {
        let mut groups: Vec<(u64, ContentHash, Vec<NodeId>)> = self
            .groups
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(hash, members)| (self.duplicated_bytes(hash, tree), *hash, members.clone()))
            .collect();
        groups.sort_by_key(|(waste, _, _)| Reverse(*waste));
        groups
            .into_iter()
            .map(|(_, hash, members)| (hash, members))
            .collect()
    }

    /// Check every member of the group for `hash` against the disk.
    ///
    /// Members that vanished or can no longer be read are dropped; the rest
    /// are rebuilt and re-hashed from fresh reads. Members whose hash
    /// changed are moved to the group for the new hash.
    ///
    /// # Errors
    ///
    /// Only errors that must abort the run (such as a filter that cannot be
    /// launched) are returned; the group is left untouched in that case.
    pub fn reverify(
        &mut self,
        hash: &ContentHash,
        tree: &mut Tree,
        fingerprinter: &mut Fingerprinter,
    ) -> Result<Vec<ReverifyEvent>, FinderError> {
        let members = self.members(hash).to_vec();
        let mut kept = Vec::with_capacity(members.len());
        let mut moved = Vec::new();
        let mut events = Vec::new();

        for node in members {
            let path = tree.path(node);
            if !tree.exists(node) {
                log::debug!("{} no longer exists", path.display());
                events.push(ReverifyEvent::Vanished { path });
                continue;
            }

            let fresh = match tree.rebuild(node) {
                Ok(fresh) => fresh,
                Err(e) => {
                    log::warn!("Failed to rebuild {}: {}", path.display(), e);
                    events.push(ReverifyEvent::Failed {
                        path,
                        error: e.into(),
                    });
                    continue;
                }
            };

            match fingerprinter.rehash(tree, fresh) {
                Ok(new_hash) if new_hash == *hash => kept.push(fresh),
                Ok(new_hash) => {
                    log::debug!("{} hash has changed to {}", path.display(), new_hash);
                    moved.push((fresh, new_hash));
                    events.push(ReverifyEvent::Changed {
                        path,
                        node: fresh,
                        new_hash,
                    });
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("Failed to re-hash {}: {}", path.display(), e);
                    events.push(ReverifyEvent::Failed { path, error: e });
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(&slot) = self.index.get(hash) {
            self.groups[slot].1 = kept;
        }
        for (node, new_hash) in moved {
            self.register(node, new_hash);
        }
        Ok(events)
    }
}
