use std::cell::Cell;

use crate::tree::DirectoryTree;

/// Receiver of "layout changed" notifications.
///
/// One port instance is shared by every node of a tree. Mutating tree
/// operations call it after they have updated node state; the port gets the
/// whole tree so it can run a layout pass before the operation returns.
pub trait LayoutPort {
    fn layout_changed(&self, tree: &mut DirectoryTree);
}

/// Recomputes the layout from the root on every notification.
#[derive(Debug, Default)]
pub struct RelayoutPort {
    passes: Cell<usize>,
    last_height: Cell<f32>,
}

impl RelayoutPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layout passes run so far.
    pub fn passes(&self) -> usize {
        self.passes.get()
    }

    /// Total height reported by the most recent pass.
    pub fn last_height(&self) -> f32 {
        self.last_height.get()
    }
}

impl LayoutPort for RelayoutPort {
    fn layout_changed(&self, tree: &mut DirectoryTree) {
        let height = tree.recompute_layout(tree.root());
        self.passes.set(self.passes.get() + 1);
        self.last_height.set(height);
        tracing::trace!(pass = self.passes.get(), height, "layout recomputed");
    }
}

/// Drops every notification. Layout only happens when asked for explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedPort;

impl LayoutPort for DetachedPort {
    fn layout_changed(&self, _tree: &mut DirectoryTree) {}
}
