// Restore tree assembly

use crate::console::sanitize_text;
use crate::models::{CatalogEntry, NodeKind, TreeNode};
use std::collections::HashSet;
use tracing::warn;

/// Merges directory and file listings into tree nodes.
///
/// Directory ids are the path id with a `-` prefix so they never collide
/// with file ids. Directories come first, then files, each in listing order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeAssembler;

impl TreeAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, directories: Vec<CatalogEntry>, files: Vec<CatalogEntry>) -> Vec<TreeNode> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(directories.len() + files.len());

        for entry in directories.into_iter().chain(files) {
            let node = Self::node(entry);
            // Repeated rows show up when merged jobs list the same item
            if !seen.insert(node.id.clone()) {
                warn!(id = %node.id, "Skipping duplicate tree node");
                continue;
            }
            nodes.push(node);
        }

        nodes
    }

    fn node(entry: CatalogEntry) -> TreeNode {
        match entry {
            CatalogEntry::Directory { path_id, name, raw } => TreeNode {
                id: format!("-{}", path_id),
                label: sanitize_text(&name),
                kind: NodeKind::Directory,
                has_children: true,
                payload: raw,
            },
            CatalogEntry::File { file_id, name, raw } => TreeNode {
                id: file_id,
                label: sanitize_text(&name),
                kind: NodeKind::File,
                has_children: false,
                payload: raw,
            },
        }
    }
}
