//! Shared plumbing for the `wtree-*` command-line tools.
//!
//! - [`init_logging`]: `tracing-subscriber` fmt output on stderr.
//! - [`demo_scene`]: built-in scene used when no file is given.
//! - [`run_frames`]: scripted update/event/draw loop for `wtree-scene`.
//! - [`Session`]: live tree driven by `wtree-worker` requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use wtree_core::canvas::{DrawCommand, RecordingCanvas};
use wtree_core::factory::ComponentFactory;
use wtree_core::geometry::Geometry;
use wtree_core::scene::SceneNode;
use wtree_core::tree::{NodeSnapshot, StatsSnapshot};
use wtree_core::{ComponentTree, Event, EventRef, TreeConfig, TreeError, TreeNode, Window};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Map a `-v` count to a level: warn, debug, then trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr subscriber.  `log` records from `wtree-core` are
/// bridged into it.  Later calls are no-ops.
pub fn init_logging(verbosity: u8) {
    // RUST_LOG=wtree_core=trace overrides -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level_for(verbosity).into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

// ---------------------------------------------------------------------------
// Configuration helpers
// ---------------------------------------------------------------------------

/// Load `path` (if any) and apply command-line overrides.
pub fn load_config(
    path: Option<&str>,
    threads: Option<usize>,
    max_depth: Option<usize>,
) -> Result<TreeConfig, TreeError> {
    let mut config = match path {
        Some(path) => TreeConfig::from_file(path)?,
        None => TreeConfig::default(),
    };
    if threads.is_some() {
        config.worker_threads = threads;
    }
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    config.validate()?;
    Ok(config)
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> Geometry {
    Geometry {
        x,
        y,
        width,
        height,
    }
}

/// A small form: title, name field, two buttons.
pub fn demo_scene(width: f32, height: f32) -> SceneNode {
    SceneNode::new("panel")
        .with_geometry(rect(0.0, 0.0, width, height))
        .with_child(
            SceneNode::new("label")
                .with_params(json!({ "text": "Name" }))
                .with_geometry(rect(16.0, 16.0, 120.0, 20.0)),
        )
        .with_child(
            SceneNode::new("text_box")
                .with_params(json!({ "placeholder": "type here", "max_len": 32 }))
                .with_geometry(rect(16.0, 40.0, 200.0, 24.0)),
        )
        .with_child(
            SceneNode::new("panel")
                .with_params(json!({ "border": { "r": 200, "g": 200, "b": 200 } }))
                .with_geometry(rect(16.0, 80.0, 200.0, 40.0))
                .with_child(
                    SceneNode::new("button")
                        .with_params(json!({ "label": "OK", "tag": "form.ok" }))
                        .with_geometry(rect(20.0, 84.0, 80.0, 32.0)),
                )
                .with_child(
                    SceneNode::new("button")
                        .with_params(json!({ "label": "Cancel", "tag": "form.cancel" }))
                        .with_geometry(rect(120.0, 84.0, 80.0, 32.0)),
                ),
        )
}

/// Parse one event, or a JSON array of events.
pub fn parse_events(json: &str) -> Result<Vec<Event>, TreeError> {
    let value: Value = serde_json::from_str(json).map_err(|e| TreeError::Scene(e.to_string()))?;
    let events = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Event>, _>>(),
        other => serde_json::from_value(other).map(|e| vec![e]),
    };
    events.map_err(|e| TreeError::Scene(format!("event: {e}")))
}

// ---------------------------------------------------------------------------
// Scripted run
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub snapshot: NodeSnapshot,
    pub kinds: BTreeMap<String, usize>,
    pub stats: StatsSnapshot,
    pub emitted: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<Vec<DrawCommand>>,
}

/// Run `frames` frames of update + draw.  `events` are dispatched after the
/// first update, so zero frames dispatches nothing.  Draw commands of the
/// last frame are kept if `record_draw`.
pub fn run_frames(
    tree: &ComponentTree,
    frames: u32,
    events: &[Event],
    record_draw: bool,
) -> RunReport {
    let mut emitted = Vec::new();
    let mut last_draw = Vec::new();
    for frame in 0..frames {
        tree.update();
        if frame == 0 {
            for event in events {
                let dispatched = tree.dispatch(&event.clone().shared());
                log::debug!(
                    "event {:?} consumed={} emitted={}",
                    event.kind(),
                    dispatched.consumed,
                    dispatched.emitted.len()
                );
                emitted.extend(dispatched.emitted.iter().map(|e| (**e).clone()));
            }
        }
        let mut canvas = RecordingCanvas::new();
        tree.draw(&mut canvas);
        last_draw = canvas.take();
    }
    let snapshot = tree.snapshot();
    RunReport {
        kinds: kind_histogram(&snapshot),
        snapshot,
        stats: tree.stats(),
        emitted,
        draw: record_draw.then_some(last_draw),
    }
}

// ---------------------------------------------------------------------------
// Worker session
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AttachParams {
    #[serde(default)]
    parent: Option<u64>,
    kind: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    children: Vec<SceneNode>,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateParams {
    frames: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EventParams {
    event: Event,
}

/// A live tree plus the factory used to grow it.
pub struct Session {
    tree: ComponentTree,
    factory: ComponentFactory,
    window: Arc<Window>,
}

impl Session {
    pub fn new(config: &TreeConfig, scene: &SceneNode, window: Arc<Window>) -> Result<Self, TreeError> {
        let factory = ComponentFactory::with_builtin_widgets();
        let tree = ComponentTree::from_scene(config, &factory, &window, scene)?;
        Ok(Self {
            tree,
            factory,
            window,
        })
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    fn node(&self, id: u64) -> Option<Arc<TreeNode>> {
        self.tree.all_nodes().into_iter().find(|n| n.id().get() == id)
    }

    /// Handle one request.  Errors are reported to the client as strings.
    pub fn dispatch(&self, method: &str, params: &Value) -> Result<Value, String> {
        match method {
            "ping" => Ok(Value::String("pong".to_owned())),
            "attach" => {
                let p: AttachParams = from_params(params)?;
                let parent = match p.parent {
                    Some(id) => self.node(id).ok_or_else(|| format!("no live node {id}"))?,
                    None => Arc::clone(self.tree.root()),
                };
                let scene = SceneNode {
                    kind: p.kind,
                    params: p.params,
                    geometry: p.geometry,
                    children: p.children,
                };
                let node = wtree_core::scene::build_scene(&parent, &self.factory, &self.window, &scene)
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "id": node.id().get(), "depth": node.depth() }))
            }
            "close" => {
                let p: IdParams = from_params(params)?;
                let closed = match self.node(p.id) {
                    Some(node) => self.tree.delete_node(&node),
                    None => false,
                };
                Ok(Value::Bool(closed))
            }
            "update" => {
                let p: UpdateParams = if params.is_null() {
                    UpdateParams::default()
                } else {
                    from_params(params)?
                };
                for _ in 0..p.frames.unwrap_or(1) {
                    self.tree.update();
                }
                to_value(self.tree.stats())
            }
            "draw" => {
                let mut canvas = RecordingCanvas::new();
                self.tree.draw(&mut canvas);
                to_value(canvas.take())
            }
            "event" => {
                let p: EventParams = from_params(params)?;
                let event: EventRef = p.event.shared();
                let dispatched = self.tree.dispatch(&event);
                let emitted: Vec<&Event> = dispatched.emitted.iter().map(|e| &**e).collect();
                Ok(json!({ "consumed": dispatched.consumed, "emitted": emitted }))
            }
            "snapshot" => to_value(self.tree.snapshot()),
            "leaves" => {
                let ids: Vec<u64> = self.tree.leaf_ids().into_iter().map(|id| id.get()).collect();
                to_value(ids)
            }
            "stats" => to_value(self.tree.stats()),
            "kinds" => to_value(self.factory.kinds()),
            _ => Err(format!("unknown method: {method}")),
        }
    }

    pub fn close(&self) {
        self.tree.close();
    }
}

fn from_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, String> {
    T::deserialize(params).map_err(|e| format!("invalid params: {e}"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Count of nodes per kind, for quick summaries.
pub fn kind_histogram(snapshot: &NodeSnapshot) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    let mut stack = vec![snapshot];
    while let Some(node) = stack.pop() {
        *counts.entry(node.kind.clone()).or_insert(0) += 1;
        stack.extend(node.children.iter());
    }
    counts
}
