//! Collapsible directory tree with a recursive row layout.
//!
//! [`tree::DirectoryTree`] holds the nodes and implements every node
//! operation; [`controller::TreeController`] owns a tree, wires the shared
//! [`notify::LayoutPort`] and exposes the batch path builder used by hosts.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod notify;
pub mod render_tree;
pub mod tree;

pub use config::{Config, LayoutConfig};
pub use controller::{InputTarget, TreeController};
pub use error::{Error, Result};
pub use notify::{DetachedPort, LayoutPort, RelayoutPort};
pub use tree::{DirectoryTree, Position, TreeNode};
