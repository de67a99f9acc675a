//! A single tree node: one component, its children, and the fan-out logic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use super::snapshot::NodeSnapshot;
use super::TreeShared;
use crate::canvas::Canvas;
use crate::component::{same_component, ComponentRef, DynComponent, FrameContext};
use crate::errors::{Result, TreeError};
use crate::event::EventRef;
use crate::lifecycle::LifecycleCell;
use crate::processor::Disposition;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier.  Later nodes get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One element of a [`ComponentTree`](super::ComponentTree).
///
/// The child list is only mutated under its own lock, and every traversal
/// works on a copy taken up front, so attaching or detaching during a
/// traversal only shows up in the next one.
pub struct TreeNode {
    id: NodeId,
    tree: Weak<TreeShared>,
    parent: Option<Weak<TreeNode>>,
    component: ComponentRef,
    depth: usize,
    children: Mutex<Vec<Arc<TreeNode>>>,
    lifecycle: LifecycleCell,
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("children", &self.children.lock().len())
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl TreeNode {
    pub(crate) fn new_root(tree: &Arc<TreeShared>, component: ComponentRef) -> Result<Arc<Self>> {
        let root = Arc::new(Self {
            id: NodeId::next(),
            tree: Arc::downgrade(tree),
            parent: None,
            component,
            depth: 0,
            children: Mutex::new(Vec::new()),
            lifecycle: LifecycleCell::new(),
        });
        root.component.base().bind_node(&root)?;
        tree.leaves.add(&root);
        Ok(root)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn component(&self) -> &ComponentRef {
        &self.component
    }

    pub fn parent(&self) -> Option<Arc<TreeNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Copy of the current child list.
    pub fn children(&self) -> Vec<Arc<TreeNode>> {
        self.children.lock().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.lock().is_empty()
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Attach `component` as the last child of this node.
    ///
    /// This node leaves the leaf set and the new node joins it, both under
    /// the tree's leaf lock.
    pub fn new_node(self: &Arc<Self>, component: ComponentRef) -> Result<Arc<TreeNode>> {
        let shared = self.tree.upgrade();
        let depth = self.depth + 1;
        if let Some(shared) = &shared {
            if depth > shared.max_depth {
                return Err(TreeError::DepthLimit {
                    depth,
                    max: shared.max_depth,
                });
            }
        }

        let child = Arc::new(TreeNode {
            id: NodeId::next(),
            tree: self.tree.clone(),
            parent: Some(Arc::downgrade(self)),
            component,
            depth,
            children: Mutex::new(Vec::new()),
            lifecycle: LifecycleCell::new(),
        });

        {
            let mut leaves = shared.as_ref().map(|s| s.leaves.lock());
            let mut children = self.children.lock();
            if !self.is_alive() {
                log::debug!("attach under closed node {} rejected", self.id);
                return Err(TreeError::ParentClosed(self.id.get()));
            }
            if let Err(err) = child.component.base().bind_node(&child) {
                log::warn!("attach under {} rejected: {err}", self.id);
                return Err(err);
            }
            children.push(Arc::clone(&child));
            if let Some(leaves) = leaves.as_mut() {
                leaves.remove(&self.id);
                leaves.insert(child.id, Arc::clone(&child));
            }
        }
        log::debug!(
            "attached {} ({}) under {} at depth {depth}",
            child.id,
            child.component.kind(),
            self.id
        );
        Ok(child)
    }

    /// Close this node and its whole subtree, then detach it.
    ///
    /// Returns `false` without doing anything when the node was already
    /// closed; exactly one concurrent caller gets `true`.
    pub fn close(self: &Arc<Self>) -> bool {
        if !self.lifecycle.close() {
            return false;
        }
        for child in self.children() {
            child.close();
        }
        self.component.close();

        let parent = self.parent();
        match self.tree.upgrade() {
            Some(shared) => {
                let mut leaves = shared.leaves.lock();
                leaves.remove(&self.id);
                if let Some(parent) = parent {
                    let mut siblings = parent.children.lock();
                    siblings.retain(|c| c.id != self.id);
                    if siblings.is_empty() && parent.is_alive() {
                        leaves.insert(parent.id, Arc::clone(&parent));
                    }
                }
            }
            None => {
                if let Some(parent) = parent {
                    parent.children.lock().retain(|c| c.id != self.id);
                }
            }
        }
        log::debug!("closed {}", self.id);
        true
    }

    // -----------------------------------------------------------------------
    // Per-frame traversal
    // -----------------------------------------------------------------------

    /// Update every child concurrently, then this node's component.
    pub fn update(&self, frame: &FrameContext) {
        if !self.is_alive() {
            return;
        }
        let children = self.children();
        children.par_iter().for_each(|child| child.update(frame));
        if !self.component.update(frame) {
            log::trace!("update of {} reported failure", self.id);
        }
        if let Some(shared) = self.tree.upgrade() {
            shared.stats.record_update();
        }
    }

    /// Draw this node's component, then each child in list order.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.is_alive() {
            return;
        }
        if !self.component.draw(canvas) {
            log::trace!("draw of {} reported failure", self.id);
        }
        for child in self.children() {
            child.draw(canvas);
        }
    }

    /// Route `event` through this subtree.
    ///
    /// Children see it first, concurrently.  If any child consumes it this
    /// node's component is skipped.  Events produced along the way are
    /// appended to `out`; returns whether the event was consumed.
    pub fn process(&self, event: &EventRef, out: &mut Vec<EventRef>) -> bool {
        if !self.is_alive() {
            return false;
        }
        let children = self.children();
        let results: Vec<(bool, Vec<EventRef>)> = children
            .par_iter()
            .map(|child| {
                let mut local = Vec::new();
                let consumed = child.process(event, &mut local);
                (consumed, local)
            })
            .collect();

        let consumers = results.iter().filter(|(consumed, _)| *consumed).count();
        for (_, local) in results {
            for produced in local {
                push_unique(out, produced);
            }
        }
        if consumers > 0 {
            if consumers > 1 {
                self.record_double_consumption(consumers);
            }
            return true;
        }

        match Disposition::classify(event, self.component.process(event)) {
            Disposition::Propagate => false,
            Disposition::Consumed => true,
            Disposition::Replaced(produced) => {
                push_unique(out, produced);
                true
            }
        }
    }

    fn record_double_consumption(&self, consumers: usize) {
        if let Some(shared) = self.tree.upgrade() {
            shared.stats.record_double_consumption();
            if shared.log_double_consumption {
                log::warn!(
                    "{consumers} children of {} consumed the same event",
                    self.id
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Node in this subtree wrapping `component`, searched concurrently.
    pub fn find_node(self: &Arc<Self>, component: &dyn DynComponent) -> Option<Arc<TreeNode>> {
        if !self.is_alive() {
            return None;
        }
        if same_component(&*self.component, component) {
            return Some(Arc::clone(self));
        }
        self.children()
            .par_iter()
            .find_map_any(|child| child.find_node(component))
    }

    /// Whether `node` is this node or one of its live descendants.
    pub fn children_tree_contains(&self, node: &TreeNode) -> bool {
        if !self.is_alive() {
            return false;
        }
        if self.id == node.id {
            return true;
        }
        self.children()
            .par_iter()
            .any(|child| child.children_tree_contains(node))
    }

    /// Close `node` if it belongs to this subtree.
    pub fn delete_node(&self, node: &Arc<TreeNode>) -> bool {
        self.children_tree_contains(node) && node.close()
    }

    /// Close the node wrapping `component` if it belongs to this subtree.
    pub fn delete_component(self: &Arc<Self>, component: &dyn DynComponent) -> bool {
        match self.find_node(component) {
            Some(node) => node.close(),
            None => false,
        }
    }

    /// Live nodes of this subtree, children before parents.
    pub fn all_nodes(self: &Arc<Self>) -> Vec<Arc<TreeNode>> {
        let mut out = Vec::new();
        self.collect_post_order(&mut out);
        out
    }

    fn collect_post_order(self: &Arc<Self>, out: &mut Vec<Arc<TreeNode>>) {
        if !self.is_alive() {
            return;
        }
        for child in self.children() {
            child.collect_post_order(out);
        }
        out.push(Arc::clone(self));
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let children = self
            .children()
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| c.snapshot())
            .collect::<Vec<_>>();
        let geometry = self.component.base().geometry();
        NodeSnapshot {
            id: self.id.get(),
            kind: self.component.kind(),
            depth: self.depth,
            geometry: geometry.is_initialized().then_some(geometry),
            is_leaf: children.is_empty(),
            children,
        }
    }
}

fn push_unique(out: &mut Vec<EventRef>, event: EventRef) {
    if !out.iter().any(|e| Arc::ptr_eq(e, &event)) {
        out.push(event);
    }
}
