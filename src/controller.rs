use indextree::NodeId;
use std::rc::Rc;

use crate::config::Config;
use crate::notify::{LayoutPort, RelayoutPort};
use crate::tree::{is_directory_name, DirectoryTree};

/// What a committed text field applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    /// New name for one node.
    Rename(NodeId),
    /// Whitespace-separated list of `/`-delimited paths added under the root.
    PathBatch,
}

/// Owns the tree and keeps its layout current.
///
/// The controller creates the single [`RelayoutPort`] of the tree, so every
/// node it creates relays "layout changed" back into a full pass from the root.
pub struct TreeController {
    tree: DirectoryTree,
    port: Rc<RelayoutPort>,
}

impl TreeController {
    /// Build the root, bind the relayout port into it and create the seed entries.
    pub fn initialize(config: &Config) -> Self {
        let port = Rc::new(RelayoutPort::new());
        let mut tree = DirectoryTree::new("", port.clone(), config.layout);
        let root = tree.root();

        let mut root_name = config.root_name.clone();
        if !is_directory_name(&root_name) {
            root_name.push('/');
        }
        tree.rename(root, &root_name);

        for entry in &config.seed_entries {
            tree.add_child(root, entry);
        }

        let mut controller = Self { tree, port };
        controller.refresh_layout();
        tracing::info!(
            root = %root_name,
            seeds = config.seed_entries.len(),
            "tree initialized"
        );
        controller
    }

    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    /// Direct access for node operations; each of them relays its own layout pass.
    pub fn tree_mut(&mut self) -> &mut DirectoryTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Number of layout passes run since initialization.
    pub fn layout_passes(&self) -> usize {
        self.port.passes()
    }

    /// Height of the whole visible tree after the last pass.
    pub fn total_height(&self) -> f32 {
        self.port.last_height()
    }

    /// Run a layout pass from the root.
    pub fn refresh_layout(&mut self) {
        self.port.layout_changed(&mut self.tree);
    }

    /// Rename a node and refresh the layout when the rename was accepted.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> bool {
        let renamed = self.tree.rename(id, new_name);
        if renamed {
            self.refresh_layout();
        }
        renamed
    }

    /// Add every whitespace-separated path in `text` under the root, in order.
    pub fn build_from_path_batch(&mut self, text: &str) {
        let root = self.tree.root();
        let mut count = 0usize;
        for path in text.split_whitespace() {
            self.tree.add_child_from_path(root, path);
            count += 1;
        }
        tracing::debug!(count, "built paths from batch");
    }

    /// Apply the content of a committed text field.
    ///
    /// Returns false when nothing was applied: an empty rename, or a rename the
    /// tree rejected.
    pub fn commit_input(&mut self, target: InputTarget, text: &str) -> bool {
        match target {
            InputTarget::Rename(id) => {
                let name = text.trim();
                if name.is_empty() {
                    return false;
                }
                self.rename(id, name)
            }
            InputTarget::PathBatch => {
                self.build_from_path_batch(text);
                true
            }
        }
    }
}
