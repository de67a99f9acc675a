//! Construct components from stable string keys.
//!
//! The application registers a constructor per key at startup; lookups of
//! unknown keys return [`TreeError::UnknownComponentKind`] instead of
//! aborting.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::component::{Component, ComponentHost, ComponentRef};
use crate::errors::{Result, TreeError};
use crate::window::Window;

/// Constructor closure stored per key.
pub type Constructor = Box<dyn Fn(&Arc<Window>, &Value) -> Result<ComponentRef> + Send + Sync>;

/// Components that can be built from JSON parameters.
pub trait FromParams: Sized {
    fn from_params(params: &Value) -> Result<Self>;
}

/// Deserialize `params` into `T`, treating `null` as "all defaults".
pub fn parse_params<T: DeserializeOwned + Default>(params: &Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    T::deserialize(params).map_err(|e| TreeError::ComponentConstruction(e.to_string()))
}

#[derive(Default)]
pub struct ComponentFactory {
    constructors: HashMap<String, Constructor>,
}

impl std::fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ComponentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory preloaded with the stock widgets.
    pub fn with_builtin_widgets() -> Self {
        let mut factory = Self::new();
        crate::widgets::register_builtin(&mut factory);
        factory
    }

    /// Register `ctor` under `key`, replacing any previous constructor.
    pub fn register<F>(&mut self, key: impl Into<String>, ctor: F)
    where
        F: Fn(&Arc<Window>, &Value) -> Result<ComponentRef> + Send + Sync + 'static,
    {
        let key = key.into();
        if self.constructors.insert(key.clone(), Box::new(ctor)).is_some() {
            log::debug!("component constructor for {key:?} replaced");
        }
    }

    /// Register a [`FromParams`] component type under `key`.
    pub fn register_component<C>(&mut self, key: impl Into<String>)
    where
        C: Component + FromParams,
    {
        self.register(key, |window, params| {
            let component: ComponentRef = ComponentHost::new(Arc::clone(window), C::from_params(params)?);
            Ok(component)
        });
    }

    pub fn create(&self, key: &str, window: &Arc<Window>, params: &Value) -> Result<ComponentRef> {
        let ctor = self
            .constructors
            .get(key)
            .ok_or_else(|| TreeError::UnknownComponentKind(key.to_owned()))?;
        ctor(window, params)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
