//! Declarative scene descriptions.
//!
//! A scene is a JSON tree of `{ "kind", "params", "geometry", "children" }`
//! objects.  Each node is built through a [`ComponentFactory`], so the set of
//! usable kinds is whatever the application registered.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::ComponentRef;
use crate::config::TreeConfig;
use crate::errors::{Result, TreeError};
use crate::factory::ComponentFactory;
use crate::geometry::Geometry;
use crate::tree::{ComponentTree, TreeNode};
use crate::window::Window;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Value::Null,
            geometry: None,
            children: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TreeError::Scene(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TreeError::Scene(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Build this node's component (not its children) and apply its geometry.
    pub fn instantiate(&self, factory: &ComponentFactory, window: &Arc<Window>) -> Result<ComponentRef> {
        let component = factory.create(&self.kind, window, &self.params)?;
        if let Some(geometry) = self.geometry {
            component.base().set_geometry(geometry)?;
        }
        Ok(component)
    }

    /// Number of nodes in this description, including itself.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(SceneNode::len).sum::<usize>()
    }
}

/// Attach `scene` (and its descendants) under `parent`.
///
/// Stops at the first error; nodes attached before it stay in the tree.
pub fn build_scene(
    parent: &Arc<TreeNode>,
    factory: &ComponentFactory,
    window: &Arc<Window>,
    scene: &SceneNode,
) -> Result<Arc<TreeNode>> {
    let component = scene.instantiate(factory, window)?;
    let node = parent.new_node(component)?;
    for child in &scene.children {
        build_scene(&node, factory, window, child)?;
    }
    Ok(node)
}

impl ComponentTree {
    /// Build a whole tree from a scene; the scene's top node becomes the root.
    pub fn from_scene(
        config: &TreeConfig,
        factory: &ComponentFactory,
        window: &Arc<Window>,
        scene: &SceneNode,
    ) -> Result<Self> {
        let tree = Self::with_config(config, scene.instantiate(factory, window)?)?;
        for child in &scene.children {
            if let Err(err) = build_scene(tree.root(), factory, window, child) {
                tree.close();
                return Err(err);
            }
        }
        log::debug!(
            "scene built: {} nodes, {} leaves",
            scene.len(),
            tree.leaves().len()
        );
        Ok(tree)
    }
}
