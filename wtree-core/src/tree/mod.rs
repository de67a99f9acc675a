//! The component tree: structure, per-frame traversal, event routing.
//!
//! # Overview
//!
//! [`ComponentTree`] owns the root [`TreeNode`] and the [`LeafSet`].  Each
//! frame the application calls:
//!
//! 1. [`ComponentTree::update`] -- children of every node are updated
//!    concurrently on rayon workers; a node's own component runs after all
//!    of its children finished (join barrier).
//! 2. [`ComponentTree::draw`] -- strictly sequential on the calling (render)
//!    thread: deferred calls first, then each node before its children, in
//!    child-list order.
//! 3. [`ComponentTree::process`] for every input event -- children first
//!    (concurrently), the node itself only if no child consumed the event.
//!
//! # Concurrent mutation
//!
//! Nodes may be attached ([`TreeNode::new_node`]) and closed
//! ([`TreeNode::close`]) from any thread, including from inside a running
//! traversal.  Traversals copy each child list before fanning out, so a
//! structural change only becomes visible to the next traversal.  The leaf
//! set is updated under a single lock on every attach/detach.
//!
//! # Sibling double-consumption
//!
//! When more than one sibling subtree consumes the same event, all of their
//! effects stand, the node reports "consumed", and the produced events are
//! merged in child-list order.  Each occurrence is counted in
//! [`StatsSnapshot::double_consumed`].

pub mod leaves;
pub mod node;
pub mod snapshot;
pub mod stats;

pub use leaves::LeafSet;
pub use node::{NodeId, TreeNode};
pub use snapshot::NodeSnapshot;
pub use stats::{StatsSnapshot, TreeStats};

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::canvas::Canvas;
use crate::component::{ComponentRef, DynComponent, FrameContext};
use crate::config::TreeConfig;
use crate::errors::{Result, TreeError};
use crate::event::EventRef;
use crate::window::Window;

/// State shared between the tree and its nodes (nodes hold it weakly).
#[derive(Debug)]
pub(crate) struct TreeShared {
    pub(crate) leaves: LeafSet,
    pub(crate) stats: TreeStats,
    pub(crate) max_depth: usize,
    pub(crate) log_double_consumption: bool,
}

/// Result of routing one event through the tree.
#[derive(Debug, Clone, Default)]
pub struct Dispatched {
    /// Whether some component consumed (or replaced) the event.
    pub consumed: bool,
    /// Events produced by replacing processors, without duplicates.
    pub emitted: Vec<EventRef>,
}

pub struct ComponentTree {
    shared: Arc<TreeShared>,
    root: Arc<TreeNode>,
    window: Arc<Window>,
    pool: Option<rayon::ThreadPool>,
    last_update: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTree")
            .field("root", &self.root)
            .field("leaves", &self.shared.leaves.len())
            .field("dedicated_pool", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

impl ComponentTree {
    /// Tree with default configuration rooted at `root`.
    pub fn new(root: ComponentRef) -> Result<Self> {
        Self::with_config(&TreeConfig::default(), root)
    }

    pub fn with_config(config: &TreeConfig, root: ComponentRef) -> Result<Self> {
        config.validate()?;
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("wtree-worker-{i}"))
                    .build()
                    .map_err(|e| TreeError::Config(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        let shared = Arc::new(TreeShared {
            leaves: LeafSet::new(),
            stats: TreeStats::default(),
            max_depth: config.effective_max_depth(),
            log_double_consumption: config.log_double_consumption,
        });
        let window = Arc::clone(root.base().window());
        let root = TreeNode::new_root(&shared, root)?;
        log::debug!("tree created with root {}", root.id());
        Ok(Self {
            shared,
            root,
            window,
            pool,
            last_update: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Window of the root component; its deferred queue is drained by `draw`.
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    // -----------------------------------------------------------------------
    // Per-frame entry points
    // -----------------------------------------------------------------------

    /// Update every live node once, measuring the delta since the last call.
    pub fn update(&self) {
        let now = Instant::now();
        let delta_seconds = {
            let mut last = self.last_update.lock();
            let delta = last.map_or(0.0, |t| now.duration_since(t).as_secs_f32());
            *last = Some(now);
            delta
        };
        let frame = FrameContext {
            frame: self.shared.stats.record_frame(),
            delta_seconds,
        };
        log::trace!("update frame {}", frame.frame);
        self.install(|| self.root.update(&frame));
    }

    /// Update with a caller-supplied frame context.
    /// Still counts as a frame for the next `update`'s delta.
    pub fn update_with(&self, frame: &FrameContext) {
        *self.last_update.lock() = Some(Instant::now());
        self.shared.stats.record_frame();
        self.install(|| self.root.update(frame));
    }

    /// Run deferred calls, then draw the whole tree on the calling thread.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        self.window.run_deferred();
        self.root.draw(canvas);
    }

    /// Route `event` and return the events produced along the way,
    /// whether or not the event was consumed.
    pub fn process(&self, event: &EventRef) -> Vec<EventRef> {
        self.dispatch(event).emitted
    }

    /// Like [`process`](Self::process) but also reports consumption.
    pub fn dispatch(&self, event: &EventRef) -> Dispatched {
        let mut emitted = Vec::new();
        let consumed = self.install(|| self.root.process(event, &mut emitted));
        self.shared.stats.record_event(consumed);
        Dispatched { consumed, emitted }
    }

    // -----------------------------------------------------------------------
    // Structure queries
    // -----------------------------------------------------------------------

    /// Live nodes in post-order (children before parents).
    pub fn all_nodes(&self) -> Vec<Arc<TreeNode>> {
        self.root.all_nodes()
    }

    pub fn find_node(&self, component: &dyn DynComponent) -> Option<Arc<TreeNode>> {
        self.install(|| self.root.find_node(component))
    }

    pub fn contains(&self, node: &TreeNode) -> bool {
        self.install(|| self.root.children_tree_contains(node))
    }

    /// Close `node` if it is part of this tree; `false` otherwise.
    pub fn delete_node(&self, node: &Arc<TreeNode>) -> bool {
        self.install(|| self.root.delete_node(node))
    }

    /// Close the node wrapping `component`; `false` if there is none.
    pub fn delete_component(&self, component: &dyn DynComponent) -> bool {
        self.install(|| self.root.delete_component(component))
    }

    pub fn leaves(&self) -> &LeafSet {
        &self.shared.leaves
    }

    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.shared.leaves.ids()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        self.root.snapshot()
    }

    pub fn max_depth(&self) -> usize {
        self.shared.max_depth
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Close every node, then empty the leaf set.  Safe to call repeatedly.
    pub fn close(&self) {
        if self.root.close() {
            log::debug!("tree rooted at {} closed", self.root.id());
        }
        self.shared.leaves.clear();
    }

    pub fn is_closed(&self) -> bool {
        !self.root.is_alive()
    }
}
