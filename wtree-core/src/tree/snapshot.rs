//! Owned, lock-free copies of a (sub)tree.
//!
//! [`NodeSnapshot`] holds no references into the live tree; it is `Send`
//! and `Serialize`, which is what the CLI tools print.

use serde::Serialize;

use crate::geometry::Geometry;

/// One node and its live subtree at the time of the snapshot.
///
/// `geometry` is `None` while the component's rectangle is unset.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: u64,
    pub kind: String,
    pub depth: usize,
    pub geometry: Option<Geometry>,
    pub is_leaf: bool,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Number of nodes in this snapshot, itself included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::len).sum::<usize>()
    }

    /// Ids in draw order (pre-order).
    pub fn ids(&self) -> Vec<u64> {
        let mut out = vec![self.id];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }
}
