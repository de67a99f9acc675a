//! Owning-window context for components.
//!
//! The surrounding application supplies a [`WindowProvider`] (sizes, pointer
//! position, frame scheduling).  [`Window`] pairs it with the deferred-call
//! queue that lets code running off the render thread schedule work that
//! must run on it.  Every component holds an `Arc<Window>` set at
//! construction; nothing here is global.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Window dimensions in either logical or physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

/// Interface to the platform window, implemented outside this crate.
pub trait WindowProvider: Send + Sync {
    /// Size in logical units, the space component geometry lives in.
    fn logical_size(&self) -> WindowSize;

    /// Size in physical pixels.
    fn real_size(&self) -> WindowSize {
        self.logical_size()
    }

    fn pointer_position(&self) -> (f32, f32);

    /// Ask the platform for another frame.
    fn request_frame(&self) {}
}

/// Provider without a platform window, used by tests and the CLI tools.
#[derive(Debug)]
pub struct HeadlessWindow {
    size: RwLock<WindowSize>,
    scale: f32,
    pointer: RwLock<(f32, f32)>,
    frame_requests: AtomicU64,
}

impl HeadlessWindow {
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_scale(width, height, 1.0)
    }

    pub fn with_scale(width: f32, height: f32, scale: f32) -> Self {
        Self {
            size: RwLock::new(WindowSize { width, height }),
            scale,
            pointer: RwLock::new((0.0, 0.0)),
            frame_requests: AtomicU64::new(0),
        }
    }

    pub fn resize(&self, width: f32, height: f32) {
        *self.size.write() = WindowSize { width, height };
    }

    pub fn move_pointer(&self, x: f32, y: f32) {
        *self.pointer.write() = (x, y);
    }

    pub fn frame_requests(&self) -> u64 {
        self.frame_requests.load(Ordering::Relaxed)
    }
}

impl WindowProvider for HeadlessWindow {
    fn logical_size(&self) -> WindowSize {
        *self.size.read()
    }

    fn real_size(&self) -> WindowSize {
        let logical = *self.size.read();
        WindowSize {
            width: logical.width * self.scale,
            height: logical.height * self.scale,
        }
    }

    fn pointer_position(&self) -> (f32, f32) {
        *self.pointer.read()
    }

    fn request_frame(&self) {
        self.frame_requests.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Deferred-call queue
// ---------------------------------------------------------------------------

type DeferredTask = Box<dyn FnOnce() + Send>;

/// FIFO of closures waiting to run on the render thread.
#[derive(Default)]
pub struct DeferredQueue {
    tasks: Mutex<VecDeque<DeferredTask>>,
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().push_back(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run everything queued so far and return how many tasks ran.
    ///
    /// Tasks queued while draining wait for the next call.
    pub fn drain_and_run(&self) -> usize {
        let batch: Vec<DeferredTask> = self.tasks.lock().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        if count > 0 {
            log::trace!("ran {count} deferred task(s)");
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Provider plus deferred queue, shared by every component of one window.
pub struct Window {
    provider: Arc<dyn WindowProvider>,
    deferred: DeferredQueue,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("logical_size", &self.logical_size())
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

impl Window {
    pub fn new(provider: Arc<dyn WindowProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            deferred: DeferredQueue::new(),
        })
    }

    /// Window backed by a fresh [`HeadlessWindow`].
    pub fn headless(width: f32, height: f32) -> Arc<Self> {
        Self::new(Arc::new(HeadlessWindow::new(width, height)))
    }

    pub fn provider(&self) -> &Arc<dyn WindowProvider> {
        &self.provider
    }

    pub fn logical_size(&self) -> WindowSize {
        self.provider.logical_size()
    }

    pub fn real_size(&self) -> WindowSize {
        self.provider.real_size()
    }

    pub fn pointer_position(&self) -> (f32, f32) {
        self.provider.pointer_position()
    }

    pub fn request_frame(&self) {
        self.provider.request_frame();
    }

    /// Queue `task` for the render thread and ask for a frame to run it.
    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.deferred.defer(task);
        self.provider.request_frame();
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Run queued deferred tasks.  Call from the render thread only.
    pub fn run_deferred(&self) -> usize {
        self.deferred.drain_and_run()
    }
}
