//! Components: the behaviour units wrapped by tree nodes.
//!
//! A concrete component is any type implementing [`Component`].  It is
//! hosted in a [`ComponentHost`], which adds the shared [`ComponentBase`]
//! (geometry, lifecycle, owning window, back-reference to its node) and the
//! per-instance [`ProcessorRegistry`].  Tree nodes see hosts through the
//! object-safe [`DynComponent`] trait as a [`ComponentRef`].
//!
//! # Serialisation
//!
//! All access to the concrete state goes through one `parking_lot::Mutex`
//! per host, so a single component is never re-entered concurrently even
//! though sibling nodes are updated and processed in parallel.
//!
//! A handler may close its own node or an ancestor synchronously.  The
//! cascade then reaches a component whose lock is already held; its
//! lifecycle still flips to closed immediately, but `on_close` is queued on
//! the window and runs at the next deferred drain (the start of `draw`).

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};

use crate::canvas::Canvas;
use crate::errors::{Result, TreeError};
use crate::event::{EventKind, EventRef};
use crate::geometry::Geometry;
use crate::lifecycle::LifecycleCell;
use crate::processor::ProcessorRegistry;
use crate::tree::TreeNode;
use crate::window::Window;

/// Per-frame data handed to `update`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameContext {
    /// Zero-based frame counter of the owning tree.
    pub frame: u64,
    /// Seconds since the previous `update` of the owning tree.
    pub delta_seconds: f32,
}

/// Behaviour of a concrete component.
///
/// `update` and `draw` report success instead of panicking so an
/// overriding implementation can decide whether to run the rest of its own
/// chain.
pub trait Component: Send + 'static {
    /// Stable kind name, used in snapshots and logs.
    fn kind(&self) -> &str {
        "component"
    }

    /// Populate the registry right after construction.
    fn register_processors(_registry: &mut ProcessorRegistry<Self>)
    where
        Self: Sized,
    {
    }

    fn update(&mut self, _base: &ComponentBase, _frame: &FrameContext) -> bool {
        true
    }

    fn draw(&mut self, _base: &ComponentBase, _canvas: &mut dyn Canvas) -> bool {
        true
    }

    /// Called exactly once, from the thread that won `close`.
    fn on_close(&mut self, _base: &ComponentBase) {}
}

// ---------------------------------------------------------------------------
// Shared base
// ---------------------------------------------------------------------------

/// State every component carries regardless of its concrete type.
pub struct ComponentBase {
    geometry: RwLock<Geometry>,
    lifecycle: LifecycleCell,
    window: Arc<Window>,
    node: OnceLock<Weak<TreeNode>>,
}

impl std::fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentBase")
            .field("geometry", &self.geometry())
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl ComponentBase {
    pub(crate) fn new(window: Arc<Window>) -> Self {
        Self {
            geometry: RwLock::new(Geometry::UNSET),
            lifecycle: LifecycleCell::new(),
            window,
            node: OnceLock::new(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        *self.geometry.read()
    }

    /// Set the rectangle, rejecting non-finite or negative values.
    pub fn init(&self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        let geometry = Geometry::new(x, y, width, height)?;
        *self.geometry.write() = geometry;
        Ok(())
    }

    pub fn set_geometry(&self, geometry: Geometry) -> Result<()> {
        self.init(geometry.x, geometry.y, geometry.width, geometry.height)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    /// The node wrapping this component, while that node is still around.
    pub fn node(&self) -> Option<Arc<TreeNode>> {
        self.node.get().and_then(Weak::upgrade)
    }

    pub fn is_mounted(&self) -> bool {
        self.node.get().is_some()
    }

    /// Close the owning node during the window's next deferred drain.
    pub fn close_deferred(&self) {
        let Some(node) = self.node.get().cloned() else {
            return;
        };
        self.window.defer(move || {
            if let Some(node) = node.upgrade() {
                node.close();
            }
        });
    }

    /// Record the owning node.  Fails with the current owner's id when the
    /// component was mounted before.
    pub(crate) fn bind_node(&self, node: &Arc<TreeNode>) -> Result<()> {
        self.node.set(Arc::downgrade(node)).map_err(|_| {
            let owner = self.node().map(|n| n.id().get()).unwrap_or_default();
            TreeError::AlreadyMounted(owner)
        })
    }
}

// ---------------------------------------------------------------------------
// Type-erased view used by tree nodes
// ---------------------------------------------------------------------------

/// Object-safe component interface seen by [`TreeNode`].
pub trait DynComponent: Send + Sync {
    fn base(&self) -> &ComponentBase;

    fn kind(&self) -> String;

    fn update(&self, frame: &FrameContext) -> bool;

    fn draw(&self, canvas: &mut dyn Canvas) -> bool;

    /// Run the handler for `event`'s kind (with ancestor fallback).
    ///
    /// Returns `event` itself when nothing handled it.
    fn process(&self, event: &EventRef) -> Option<EventRef>;

    /// Close the component; `false` when it was already closed.
    fn close(&self) -> bool;
}

/// Shared handle to a hosted component of any concrete type.
pub type ComponentRef = Arc<dyn DynComponent>;

/// Reference identity of two components.
pub fn same_component(a: &dyn DynComponent, b: &dyn DynComponent) -> bool {
    std::ptr::addr_eq(a, b)
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

struct HostInner<C> {
    state: C,
    processors: ProcessorRegistry<C>,
}

/// A concrete component together with its base and processor registry.
pub struct ComponentHost<C: Component> {
    base: ComponentBase,
    inner: Mutex<HostInner<C>>,
    this: Weak<Self>,
}

impl<C: Component> std::fmt::Debug for ComponentHost<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHost")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl<C: Component> ComponentHost<C> {
    /// Host `state` in `window` and run its processor-registration hook.
    pub fn new(window: Arc<Window>, state: C) -> Arc<Self> {
        let mut processors = ProcessorRegistry::new();
        C::register_processors(&mut processors);
        Arc::new_cyclic(|this| Self {
            base: ComponentBase::new(window),
            inner: Mutex::new(HostInner { state, processors }),
            this: this.clone(),
        })
    }

    pub fn base(&self) -> &ComponentBase {
        &self.base
    }

    pub fn init(&self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.base.init(x, y, width, height)
    }

    pub fn register_processor<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&mut C, &ComponentBase, &EventRef) -> Option<EventRef> + Send + Sync + 'static,
    {
        self.inner.lock().processors.register(kind, handler);
    }

    /// Kind of the handler that would serve `kind`, if any.
    pub fn processor_for(&self, kind: &EventKind) -> Option<EventKind> {
        self.inner.lock().processors.resolve(kind)
    }

    /// Run `f` with exclusive access to the concrete state.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.lock().state)
    }

    /// Run `f` on the render thread during the next deferred drain.
    ///
    /// Skipped if the component is closed (or dropped) by then.  `f` runs
    /// with the state locked; closing this component's node from it pushes
    /// `on_close` to the following drain.
    pub fn defer<F>(self: &Arc<Self>, f: F)
    where
        F: FnOnce(&mut C, &ComponentBase) + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        self.base.window.defer(move || {
            if let Some(host) = weak.upgrade() {
                if host.base.is_alive() {
                    let mut inner = host.inner.lock();
                    f(&mut inner.state, &host.base);
                }
            }
        });
    }

    pub fn is_alive(&self) -> bool {
        self.base.is_alive()
    }
}

impl<C: Component> DynComponent for ComponentHost<C> {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn kind(&self) -> String {
        self.inner.lock().state.kind().to_owned()
    }

    fn update(&self, frame: &FrameContext) -> bool {
        if !self.base.is_alive() {
            return false;
        }
        self.inner.lock().state.update(&self.base, frame)
    }

    fn draw(&self, canvas: &mut dyn Canvas) -> bool {
        if !self.base.is_alive() {
            return false;
        }
        self.inner.lock().state.draw(&self.base, canvas)
    }

    fn process(&self, event: &EventRef) -> Option<EventRef> {
        if !self.base.is_alive() {
            return Some(Arc::clone(event));
        }
        let kind = event.kind();
        let mut guard = self.inner.lock();
        let HostInner { state, processors } = &mut *guard;
        match processors.get(&kind) {
            Some(handler) => handler(state, &self.base, event),
            None => Some(Arc::clone(event)),
        }
    }

    fn close(&self) -> bool {
        if !self.base.lifecycle.close() {
            return false;
        }
        // Held by a running handler or update: possibly our own caller.
        match self.inner.try_lock() {
            Some(mut inner) => inner.state.on_close(&self.base),
            None => {
                log::debug!("component busy, on_close deferred");
                let this = self.this.clone();
                self.base.window.defer(move || {
                    if let Some(host) = this.upgrade() {
                        host.inner.lock().state.on_close(&host.base);
                    }
                });
            }
        }
        true
    }
}

impl std::fmt::Debug for dyn DynComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynComponent")
            .field("node", &self.base().node().map(|n| n.id()))
            .field("base", self.base())
            .finish_non_exhaustive()
    }
}
