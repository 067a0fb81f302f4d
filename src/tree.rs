use indextree::{Arena, NodeId};
use std::fmt;
use std::rc::Rc;

use crate::config::LayoutConfig;
use crate::notify::LayoutPort;

/// Returns true if `name` marks a directory, i.e. ends in `/` or `\`.
pub fn is_directory_name(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}

/// Anchored position of a node relative to its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One entry of the directory tree.
pub struct TreeNode {
    display_name: String,
    is_open: bool,
    pending_deletion: bool,
    /// Visibility of this node alone. Children carry their own flag.
    active: bool,
    position: Position,
    port: Rc<dyn LayoutPort>,
}

impl TreeNode {
    /// Create a node whose kind and open state follow from `name`.
    pub fn new(name: impl Into<String>, port: Rc<dyn LayoutPort>) -> Self {
        let display_name = name.into();
        let is_open = is_directory_name(&display_name);
        Self {
            display_name,
            is_open,
            pending_deletion: false,
            active: true,
            position: Position::default(),
            port,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_directory(&self) -> bool {
        is_directory_name(&self.display_name)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.pending_deletion
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Apply a new name and derive directory/open state from it.
    fn apply_name(&mut self, name: &str) {
        self.display_name = name.to_string();
        self.is_open = is_directory_name(name);
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("display_name", &self.display_name)
            .field("is_open", &self.is_open)
            .field("pending_deletion", &self.pending_deletion)
            .field("active", &self.active)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Collapsible directory tree backed by an arena allocator.
///
/// Nodes are addressed by [`NodeId`]. Every mutating operation notifies the
/// node's [`LayoutPort`] after its own state change is complete. Children
/// marked for deletion stay linked until the next layout pass over their
/// parent, which is the only place children are ever unlinked.
pub struct DirectoryTree {
    arena: Arena<TreeNode>,
    root: NodeId,
    layout: LayoutConfig,
}

impl DirectoryTree {
    /// Create a tree holding only a root node.
    pub fn new(root_name: &str, port: Rc<dyn LayoutPort>, layout: LayoutConfig) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(TreeNode::new(root_name, port));
        Self {
            arena,
            root,
            layout,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout
    }

    /// Look up a node that is still part of the tree.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        let node = self.arena.get(id)?;
        if id.is_removed(&self.arena) {
            return None;
        }
        Some(node.get())
    }

    /// Like [`DirectoryTree::node`], but also rejects nodes marked for deletion.
    fn live_node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        if self.arena.get(id).is_none() || id.is_removed(&self.arena) {
            tracing::warn!(?id, "operation on a node that is no longer in the tree");
            return None;
        }
        let node = self.arena.get_mut(id)?.get_mut();
        if node.pending_deletion {
            tracing::debug!(name = %node.display_name, "ignoring operation on node pending deletion");
            return None;
        }
        Some(node)
    }

    /// Children of `id` in display order, including ones not yet reaped.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if self.node(id).is_none() {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?;
        self.arena.get(id)?.parent()
    }

    fn live_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|&child| self.node(child).is_some_and(|n| !n.pending_deletion))
            .collect()
    }

    /// Counts children still awaiting reaping; they stay linked until a pass over `id`.
    fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// First direct child whose name equals `name` exactly.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.live_children(id)
            .into_iter()
            .find(|&child| self.node(child).is_some_and(|n| n.display_name == name))
    }

    /// Position of `id` in root coordinates, folding the parent-relative offsets.
    pub fn absolute_position(&self, id: NodeId) -> Position {
        if self.node(id).is_none() {
            return Position::default();
        }
        id.ancestors(&self.arena)
            .filter_map(|ancestor| self.node(ancestor))
            .fold(Position::default(), |acc, node| {
                Position::new(acc.x + node.position.x, acc.y + node.position.y)
            })
    }

    fn notify(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let port = Rc::clone(&node.port);
        port.layout_changed(self);
    }

    fn set_children_active(&mut self, id: NodeId, active: bool) {
        for child in self.live_children(id) {
            if let Some(node) = self.arena.get_mut(child) {
                node.get_mut().active = active;
            }
        }
    }

    /// Rename a node, deriving directory and open state from the new name.
    ///
    /// A node with children keeps its name when `new_name` is not a directory
    /// name. Does not notify the layout port.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> bool {
        let demotes = !is_directory_name(new_name);
        if demotes && self.has_children(id) {
            tracing::debug!(new_name, "rejected rename of a non-empty directory to a file name");
            return false;
        }
        let Some(node) = self.live_node_mut(id) else {
            return false;
        };
        node.apply_name(new_name);
        let is_open = node.is_open;
        // Renaming to a directory name reopens it, so its children must show again.
        self.set_children_active(id, is_open);
        tracing::debug!(new_name, "renamed node");
        true
    }

    /// Append a new child named `name`. Returns `None` if `id` is not a directory.
    pub fn add_child(&mut self, id: NodeId, name: &str) -> Option<NodeId> {
        let parent = self.live_node_mut(id)?;
        if !parent.is_directory() {
            tracing::debug!(parent = %parent.display_name, name, "cannot add a child to a file");
            return None;
        }
        let mut child = TreeNode::new(String::new(), Rc::clone(&parent.port));
        child.active = parent.is_open;

        let child_id = self.arena.new_node(child);
        let named = self.rename(child_id, name);
        debug_assert!(named, "a fresh node has no children, so any name is accepted");
        id.append(child_id, &mut self.arena);
        tracing::debug!(name, "added child");

        self.notify(id);
        Some(child_id)
    }

    /// Materialize a `/`-separated path below `id`, reusing existing entries.
    ///
    /// Every segment followed by a `/` becomes a directory; the last segment
    /// is a file unless the path ends in `/`. Empty segments are skipped.
    pub fn add_child_from_path(&mut self, id: NodeId, path: &str) {
        let (head, tail) = match path.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (path, None),
        };

        if head.is_empty() {
            if let Some(tail) = tail {
                self.add_child_from_path(id, tail);
            }
            return;
        }

        let name = match tail {
            Some(_) => format!("{head}/"),
            None => head.to_string(),
        };

        let next = match self.find_child(id, &name) {
            Some(existing) => existing,
            None => match self.add_child(id, &name) {
                Some(created) => created,
                None => return,
            },
        };

        if let Some(tail) = tail.filter(|t| !t.is_empty()) {
            self.add_child_from_path(next, tail);
        }
    }

    /// Flip the open state of a directory that has children.
    pub fn toggle_open(&mut self, id: NodeId) {
        if !self.has_children(id) {
            return;
        }
        let Some(node) = self.live_node_mut(id) else {
            return;
        };
        if !node.is_directory() {
            return;
        }
        node.is_open = !node.is_open;
        let is_open = node.is_open;
        tracing::debug!(name = %node.display_name, is_open, "toggled directory");

        self.set_children_active(id, is_open);
        self.notify(id);
    }

    /// Hide a node and flag it for removal by the next layout pass.
    ///
    /// The root cannot be deleted.
    pub fn mark_for_deletion(&mut self, id: NodeId) {
        if id == self.root {
            tracing::debug!("ignoring delete request for the root");
            return;
        }
        let Some(node) = self.live_node_mut(id) else {
            return;
        };
        node.pending_deletion = true;
        node.active = false;
        tracing::debug!(name = %node.display_name, "marked for deletion");

        self.notify(id);
    }

    /// Place the visible descendants of `id` and return the height they span.
    ///
    /// Invisible nodes take no space. A closed directory or a file takes one
    /// row. An open directory takes its own row plus the height of every
    /// visible child subtree; children are stacked below it in order at a
    /// fixed indent. Children marked for deletion are unlinked here.
    pub fn recompute_layout(&mut self, id: NodeId) -> f32 {
        let Some(node) = self.node(id) else {
            return 0.0;
        };
        if !node.active {
            return 0.0;
        }

        let mut next_pos = self.layout.row_height;
        if !node.is_open {
            return next_pos;
        }

        // Snapshot the child list: reaping unlinks entries while we walk it.
        let children: Vec<NodeId> = id.children(&self.arena).collect();

        for child in children {
            let Some(child_node) = self.arena.get_mut(child) else {
                continue;
            };
            let child_node = child_node.get_mut();
            if child_node.pending_deletion {
                tracing::trace!(name = %child_node.display_name, "reaping deleted node");
                child.remove_subtree(&mut self.arena);
                continue;
            }
            child_node.position = Position::new(self.layout.indent, next_pos);

            next_pos += self.recompute_layout(child);
        }

        next_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DetachedPort;
    use proptest::prelude::*;
    use std::cell::Cell;

    const ROW: f32 = 10.0;

    #[derive(Default)]
    struct CountingPort {
        calls: Cell<usize>,
    }

    impl LayoutPort for CountingPort {
        fn layout_changed(&self, _tree: &mut DirectoryTree) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    fn layout() -> LayoutConfig {
        LayoutConfig {
            row_height: ROW,
            indent: 4.0,
        }
    }

    fn detached_tree() -> DirectoryTree {
        DirectoryTree::new("Root/", Rc::new(DetachedPort), layout())
    }

    fn name_of(tree: &DirectoryTree, id: NodeId) -> &str {
        tree.node(id).unwrap().display_name()
    }

    fn child_names(tree: &DirectoryTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .into_iter()
            .map(|c| name_of(tree, c).to_string())
            .collect()
    }

    proptest! {
        #[test]
        fn prop_directory_names_create_open_directories(stem in "[a-zA-Z0-9 ._-]{0,12}", sep in "[/\\\\]") {
            let node = TreeNode::new(format!("{stem}{sep}"), Rc::new(DetachedPort));
            prop_assert!(node.is_directory());
            prop_assert!(node.is_open());
        }

        #[test]
        fn prop_other_names_create_closed_files(name in "[a-zA-Z0-9 ._-]{0,12}") {
            let node = TreeNode::new(name, Rc::new(DetachedPort));
            prop_assert!(!node.is_directory());
            prop_assert!(!node.is_open());
        }

        #[test]
        fn prop_non_empty_directory_rejects_file_name(name in "[a-zA-Z0-9 ._-]{1,12}") {
            let mut tree = detached_tree();
            let dir = tree.add_child(tree.root(), "dir/").unwrap();
            tree.add_child(dir, "inner").unwrap();

            prop_assert!(!tree.rename(dir, &name));
            prop_assert_eq!(name_of(&tree, dir), "dir/");
            prop_assert!(tree.node(dir).unwrap().is_directory());
        }
    }

    #[test]
    fn test_rename_updates_kind_and_open_state() {
        let mut tree = detached_tree();
        let item = tree.add_child(tree.root(), "notes").unwrap();
        assert!(!tree.node(item).unwrap().is_directory());

        assert!(tree.rename(item, "notes/"));
        assert!(tree.node(item).unwrap().is_directory());
        assert!(tree.node(item).unwrap().is_open());

        assert!(tree.rename(item, "notes.txt"));
        assert!(!tree.node(item).unwrap().is_directory());
        assert!(!tree.node(item).unwrap().is_open());
    }

    #[test]
    fn test_rename_to_directory_reopens_and_shows_children() {
        let mut tree = detached_tree();
        let dir = tree.add_child(tree.root(), "dir/").unwrap();
        let child = tree.add_child(dir, "a").unwrap();
        tree.toggle_open(dir);
        assert!(!tree.node(child).unwrap().is_active());

        assert!(tree.rename(dir, "renamed\\"));
        assert!(tree.node(dir).unwrap().is_open());
        assert!(tree.node(child).unwrap().is_active());
    }

    #[test]
    fn test_add_child_to_file_is_rejected() {
        let mut tree = detached_tree();
        let file = tree.add_child(tree.root(), "file.txt").unwrap();

        assert!(tree.add_child(file, "nested").is_none());
        assert!(tree.children(file).is_empty());
    }

    #[test]
    fn test_add_child_appends_and_notifies_once() {
        let port = Rc::new(CountingPort::default());
        let mut tree = DirectoryTree::new("Root/", port.clone(), layout());
        let root = tree.root();

        tree.add_child(root, "b").unwrap();
        assert_eq!(port.calls.get(), 1);
        tree.add_child(root, "a").unwrap();
        assert_eq!(port.calls.get(), 2);

        assert_eq!(child_names(&tree, root), vec!["b", "a"]);
    }

    #[test]
    fn test_children_share_the_root_port() {
        let port = Rc::new(CountingPort::default());
        let mut tree = DirectoryTree::new("Root/", port.clone(), layout());
        let dir = tree.add_child(tree.root(), "dir/").unwrap();
        let sub = tree.add_child(dir, "sub/").unwrap();
        tree.add_child(sub, "leaf").unwrap();

        assert_eq!(port.calls.get(), 3);
        assert_eq!(Rc::strong_count(&port), 5);
    }

    #[test]
    fn test_add_child_from_path_builds_nested_entries() {
        let mut tree = detached_tree();
        let root = tree.root();
        tree.add_child_from_path(root, "a/b/c");

        let a = tree.children(root);
        assert_eq!(a.len(), 1);
        assert_eq!(name_of(&tree, a[0]), "a/");
        assert!(tree.node(a[0]).unwrap().is_directory());

        let b = tree.children(a[0]);
        assert_eq!(b.len(), 1);
        assert_eq!(name_of(&tree, b[0]), "b/");
        assert!(tree.node(b[0]).unwrap().is_directory());

        let c = tree.children(b[0]);
        assert_eq!(c.len(), 1);
        assert_eq!(name_of(&tree, c[0]), "c");
        assert!(!tree.node(c[0]).unwrap().is_directory());
    }

    #[test]
    fn test_add_child_from_path_reuses_directories() {
        let mut tree = detached_tree();
        let root = tree.root();
        tree.add_child_from_path(root, "a/x");
        tree.add_child_from_path(root, "a/y");

        let dirs = tree.children(root);
        assert_eq!(dirs.len(), 1);
        assert_eq!(child_names(&tree, dirs[0]), vec!["x", "y"]);
    }

    #[test]
    fn test_add_child_from_path_skips_empty_segments() {
        let mut tree = detached_tree();
        let root = tree.root();
        tree.add_child_from_path(root, "/docs//guide/");
        tree.add_child_from_path(root, "docs/guide/intro.md");

        let docs = tree.find_child(root, "docs/").unwrap();
        let guide = tree.find_child(docs, "guide/").unwrap();
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(child_names(&tree, guide), vec!["intro.md"]);
    }

    #[test]
    fn test_add_child_from_path_stops_at_files() {
        let mut tree = detached_tree();
        let root = tree.root();
        let file = tree.add_child(root, "a").unwrap();

        tree.add_child_from_path(file, "b/c");
        assert!(tree.children(file).is_empty());
    }

    #[test]
    fn test_duplicate_names_alias_to_first_match() {
        let mut tree = detached_tree();
        let root = tree.root();
        let first = tree.add_child(root, "dup/").unwrap();
        let second = tree.add_child(root, "dup/").unwrap();

        tree.add_child_from_path(root, "dup/inner");
        assert_eq!(tree.children(first).len(), 1);
        assert!(tree.children(second).is_empty());
    }

    #[test]
    fn test_toggle_childless_directory_is_noop() {
        let port = Rc::new(CountingPort::default());
        let mut tree = DirectoryTree::new("Root/", port.clone(), layout());
        let dir = tree.add_child(tree.root(), "empty/").unwrap();
        let calls = port.calls.get();

        tree.toggle_open(dir);
        assert!(tree.node(dir).unwrap().is_open());
        assert_eq!(port.calls.get(), calls);
    }

    #[test]
    fn test_toggle_hides_direct_children_only() {
        let port = Rc::new(CountingPort::default());
        let mut tree = DirectoryTree::new("Root/", port.clone(), layout());
        let dir = tree.add_child(tree.root(), "dir/").unwrap();
        let sub = tree.add_child(dir, "sub/").unwrap();
        let leaf = tree.add_child(sub, "leaf").unwrap();
        let calls = port.calls.get();

        tree.toggle_open(dir);
        assert!(!tree.node(dir).unwrap().is_open());
        assert!(!tree.node(sub).unwrap().is_active());
        assert!(tree.node(leaf).unwrap().is_active());
        assert_eq!(port.calls.get(), calls + 1);

        tree.toggle_open(dir);
        assert!(tree.node(sub).unwrap().is_active());
    }

    #[test]
    fn test_child_added_to_closed_directory_stays_hidden() {
        let mut tree = detached_tree();
        let dir = tree.add_child(tree.root(), "dir/").unwrap();
        tree.add_child(dir, "a").unwrap();
        tree.toggle_open(dir);

        let late = tree.add_child(dir, "b").unwrap();
        assert!(!tree.node(late).unwrap().is_active());
    }

    #[test]
    fn test_deletion_is_reaped_by_one_layout_pass() {
        let mut tree = detached_tree();
        let root = tree.root();
        let keep = tree.add_child(root, "keep").unwrap();
        let doomed = tree.add_child(root, "doomed/").unwrap();
        tree.add_child(doomed, "inside").unwrap();
        let after = tree.add_child(root, "after").unwrap();

        tree.mark_for_deletion(doomed);
        assert_eq!(tree.children(root).len(), 3);
        assert!(tree.find_child(root, "doomed/").is_none());
        assert!(!tree.node(doomed).unwrap().is_active());

        let height = tree.recompute_layout(root);
        assert_eq!(tree.children(root), vec![keep, after]);
        assert!(tree.node(doomed).is_none());
        assert_eq!(height, 3.0 * ROW);

        let again = tree.recompute_layout(root);
        assert_eq!(tree.children(root), vec![keep, after]);
        assert_eq!(again, height);
    }

    #[test]
    fn test_pending_node_ignores_further_mutation() {
        let mut tree = detached_tree();
        let dir = tree.add_child(tree.root(), "dir/").unwrap();
        tree.mark_for_deletion(dir);

        assert!(!tree.rename(dir, "other/"));
        assert!(tree.add_child(dir, "x").is_none());
        assert_eq!(name_of(&tree, dir), "dir/");
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let mut tree = detached_tree();
        let root = tree.root();
        tree.mark_for_deletion(root);

        assert!(!tree.node(root).unwrap().is_pending_deletion());
        assert_eq!(tree.recompute_layout(root), ROW);
    }

    #[test]
    fn test_closed_directory_reopens_to_reap_hidden_deletion() {
        let mut tree = detached_tree();
        let root = tree.root();
        let dir = tree.add_child(root, "dir/").unwrap();
        let a = tree.add_child(dir, "a").unwrap();
        tree.toggle_open(dir);
        tree.mark_for_deletion(a);

        tree.toggle_open(dir);
        assert!(tree.node(dir).unwrap().is_open());
        assert!(!tree.node(a).unwrap().is_active());

        assert_eq!(tree.recompute_layout(root), 2.0 * ROW);
        assert!(tree.children(dir).is_empty());
        assert!(tree.node(a).is_none());
    }

    #[test]
    fn test_unreaped_child_still_blocks_file_rename() {
        let mut tree = detached_tree();
        let root = tree.root();
        let dir = tree.add_child(root, "dir/").unwrap();
        let a = tree.add_child(dir, "a").unwrap();
        tree.toggle_open(dir);
        tree.mark_for_deletion(a);

        assert!(!tree.rename(dir, "plain"));
        assert!(tree.node(dir).unwrap().is_directory());
        assert_eq!(tree.children(dir), vec![a]);
    }

    #[test]
    fn test_closed_directory_takes_one_row() {
        let mut tree = detached_tree();
        let root = tree.root();
        let dir = tree.add_child(root, "dir/").unwrap();
        let a = tree.add_child(dir, "a").unwrap();
        tree.add_child(dir, "b").unwrap();
        tree.recompute_layout(root);
        let before = tree.node(a).unwrap().position();

        tree.toggle_open(dir);
        assert_eq!(tree.recompute_layout(dir), ROW);
        assert_eq!(tree.node(a).unwrap().position(), before);
    }

    #[test]
    fn test_open_directory_stacks_leaves() {
        let mut tree = detached_tree();
        let root = tree.root();
        let leaves: Vec<NodeId> = (0..5)
            .map(|i| tree.add_child(root, &format!("leaf{i}")).unwrap())
            .collect();

        let height = tree.recompute_layout(root);
        assert_eq!(height, (leaves.len() as f32 + 1.0) * ROW);

        let offsets: Vec<f32> = leaves
            .iter()
            .map(|&l| tree.node(l).unwrap().position().y)
            .collect();
        for pair in offsets.windows(2) {
            assert!(pair[1] - pair[0] >= ROW);
        }
        assert!(leaves
            .iter()
            .all(|&l| tree.node(l).unwrap().position().x == 4.0));
    }

    #[test]
    fn test_nested_subtrees_push_siblings_down() {
        let mut tree = detached_tree();
        let root = tree.root();
        let dir = tree.add_child(root, "dir/").unwrap();
        tree.add_child(dir, "a").unwrap();
        tree.add_child(dir, "b").unwrap();
        let sibling = tree.add_child(root, "z").unwrap();

        assert_eq!(tree.recompute_layout(root), 5.0 * ROW);
        assert_eq!(tree.node(dir).unwrap().position().y, ROW);
        assert_eq!(tree.node(sibling).unwrap().position().y, 4.0 * ROW);

        let b = tree.find_child(dir, "b").unwrap();
        assert_eq!(tree.absolute_position(b), Position::new(8.0, 3.0 * ROW));
    }

    #[test]
    fn test_hidden_subtree_takes_no_space() {
        let mut tree = detached_tree();
        let root = tree.root();
        let dir = tree.add_child(root, "dir/").unwrap();
        let sub = tree.add_child(dir, "sub/").unwrap();
        tree.add_child(sub, "x").unwrap();
        tree.toggle_open(dir);

        assert_eq!(tree.recompute_layout(sub), 0.0);
        assert_eq!(tree.recompute_layout(root), 2.0 * ROW);
    }
}
