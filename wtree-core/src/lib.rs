//! `wtree_core` -- concurrent component tree for windowed applications.
//!
//! Components are arranged in a tree.  Each frame, children are updated in
//! parallel on rayon workers, drawing is sequential on the render thread,
//! and input events are routed leaf-first with early termination.  Nodes
//! can be attached and closed from any thread at any time.
//!
//! This crate has no windowing or rendering backend; it talks to the outside
//! world through [`window::WindowProvider`] and [`canvas::Canvas`].  The
//! `wtree-cli` crate drives it headlessly.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `TreeError` enum via `thiserror` |
//! | [`config`] | `TreeConfig` loaded from JSON |
//! | [`event`] | Event model and the kind hierarchy used for handler fallback |
//! | [`processor`] | Per-component handler registry and dispositions |
//! | [`component`] | `Component` trait, shared base, host and type-erased view |
//! | [`tree`] | Nodes, leaf set, traversal via Rayon, stats and snapshots |
//! | [`window`] | Window abstraction and the deferred-call queue |
//! | [`canvas`] | Draw interface and a recording implementation |
//! | [`factory`] | Build components from string keys |
//! | [`scene`] | JSON scene descriptions |
//! | [`widgets`] | Stock panel, label, button and text box |

pub mod canvas;
pub mod component;
pub mod config;
pub mod errors;
pub mod event;
pub mod factory;
pub mod geometry;
pub mod lifecycle;
pub mod processor;
pub mod scene;
pub mod tree;
pub mod widgets;
pub mod window;

pub use component::{Component, ComponentBase, ComponentHost, ComponentRef, DynComponent, FrameContext};
pub use config::TreeConfig;
pub use errors::{Result, TreeError};
pub use event::{Event, EventKind, EventRef};
pub use tree::{ComponentTree, Dispatched, NodeId, TreeNode};
pub use window::Window;
