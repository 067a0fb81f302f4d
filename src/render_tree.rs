use indextree::NodeId;

use crate::tree::DirectoryTree;

/// One visible line of the tree, in root coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub is_open: bool,
    /// True when a toggle would change anything (directory with linked children).
    pub can_toggle: bool,
    pub x: f32,
    pub y: f32,
    pub height: f32,
}

impl RenderRow {
    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.y && y < self.y + self.height
    }
}

/// Flatten the visible part of the tree in display order.
///
/// Uses the positions from the last layout pass, so callers should render
/// after a mutation has triggered one.
pub fn visible_rows(tree: &DirectoryTree) -> Vec<RenderRow> {
    let mut rows = Vec::new();
    collect_rows(tree, tree.root(), 0, &mut rows);
    rows
}

fn collect_rows(tree: &DirectoryTree, id: NodeId, depth: usize, out: &mut Vec<RenderRow>) {
    let Some(node) = tree.node(id) else {
        return;
    };
    if !node.is_active() || node.is_pending_deletion() {
        return;
    }

    let at = tree.absolute_position(id);
    let children = tree.children(id);

    out.push(RenderRow {
        id,
        name: node.display_name().to_string(),
        depth,
        is_dir: node.is_directory(),
        is_open: node.is_open(),
        // Same guard as `toggle_open`: unreaped children still count.
        can_toggle: node.is_directory() && !children.is_empty(),
        x: at.x,
        y: at.y,
        height: tree.layout_config().row_height,
    });

    if !node.is_open() {
        return;
    }
    for child in children {
        collect_rows(tree, child, depth + 1, out);
    }
}

/// Row under the vertical coordinate `y`, if any.
pub fn row_at(rows: &[RenderRow], y: f32) -> Option<&RenderRow> {
    rows.iter().find(|row| row.contains_y(y))
}
