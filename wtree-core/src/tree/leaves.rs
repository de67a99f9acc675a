//! The tree's leaf set.
//!
//! One `parking_lot::Mutex` guards the whole set.  Single operations lock
//! it themselves; attach/detach in [`TreeNode`] take the guard once via
//! [`LeafSet::lock`] and perform both of their edits under it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::node::{NodeId, TreeNode};

pub(crate) type LeafMap = BTreeMap<NodeId, Arc<TreeNode>>;

/// Nodes that are alive and have no children, keyed by [`NodeId`].
#[derive(Debug, Default)]
pub struct LeafSet {
    nodes: Mutex<LeafMap>,
}

impl LeafSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, LeafMap> {
        self.nodes.lock()
    }

    /// Returns `false` if the node was already a member.
    pub(crate) fn add(&self, node: &Arc<TreeNode>) -> bool {
        self.nodes
            .lock()
            .insert(node.id(), Arc::clone(node))
            .is_none()
    }

    /// The oldest leaf.
    pub fn first(&self) -> Option<Arc<TreeNode>> {
        self.nodes.lock().values().next().cloned()
    }

    pub(crate) fn clear(&self) {
        self.nodes.lock().clear();
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.lock().contains_key(&id)
    }

    /// Member ids in ascending order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.lock().keys().copied().collect()
    }

    pub fn nodes(&self) -> Vec<Arc<TreeNode>> {
        self.nodes.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}
