//! Box-drawing dump of a snapshot.
//!
//! ```text
//! ╷ [dir 2] photos
//! ├─┐ [dir 1] 2019
//! │ ╰─╴ [file 1.2 MiB] beach.jpg
//! ╰─╴ [link: ../other] latest
//! ```
//!
//! The first symbol tells whether a node has children and a parent:
//! `┐` both, `╷` children only, `╴` parent only, `·` neither.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::scanner::{NodeId, NodeKind, Tree};

/// Renders nodes of a [`Tree`] with box-drawing prefixes.
pub struct TreeDump<'a> {
    tree: &'a Tree,
}

impl<'a> TreeDump<'a> {
    /// Create a dumper over `tree`.
    #[must_use]
    pub fn new(tree: &'a Tree) -> Self {
        Self { tree }
    }

    /// Write the subtree under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, id: NodeId) -> io::Result<()> {
        self.write_node(writer, id, "", "")
    }

    fn write_node<W: Write>(
        &self,
        writer: &mut W,
        id: NodeId,
        first: &str,
        rest: &str,
    ) -> io::Result<()> {
        let tree = self.tree;
        let children = tree.children(id);
        let has_parent = tree.parent(id).is_some();
        let symbol = match (!children.is_empty(), has_parent) {
            (true, true) => '┐',
            (true, false) => '╷',
            (false, true) => '╴',
            (false, false) => '·',
        };
        writeln!(
            writer,
            "{first}{symbol} [{}] {}",
            self.describe(id),
            tree.name(id).to_string_lossy()
        )?;

        let last = children.len().saturating_sub(1);
        for (k, &child) in children.iter().enumerate() {
            let (branch, cont) = if k == last {
                ("╰─", "  ")
            } else {
                ("├─", "│ ")
            };
            self.write_node(writer, child, &format!("{rest}{branch}"), &format!("{rest}{cont}"))?;
        }
        Ok(())
    }

    fn describe(&self, id: NodeId) -> String {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Directory => format!("dir {}", tree.children(id).len()),
            NodeKind::File => format!("file {}", ByteSize::b(tree.size(id))),
            NodeKind::Symlink => format!(
                "link: {}",
                tree.target(id).map(|t| t.to_string_lossy()).unwrap_or_default()
            ),
            other => other.as_str().to_string(),
        }
    }
}
