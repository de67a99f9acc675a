//! Tree configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TreeError};

/// Default maximum node depth accepted by `new_node`.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard ceiling for `max_depth`; close and traversal recurse once per level.
pub const MAX_TREE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Size of a dedicated rayon pool for fan-out; `None` uses the global pool.
    pub worker_threads: Option<usize>,
    /// Deepest allowed node (root is depth 0), clamped to [`MAX_TREE_DEPTH`].
    pub max_depth: usize,
    /// Log a warning when sibling subtrees consume the same event.
    pub log_double_consumption: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_depth: DEFAULT_MAX_DEPTH,
            log_double_consumption: true,
        }
    }
}

impl TreeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TreeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(TreeError::Config("worker_threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_TREE_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let c = TreeConfig::from_json_str("{}").unwrap();
        assert_eq!(c, TreeConfig::default());
        assert!(c.worker_threads.is_none());
        assert_eq!(c.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_max_depth_is_clamped() {
        let c = TreeConfig::from_json_str(r#"{"max_depth": 100000}"#).unwrap();
        assert_eq!(c.effective_max_depth(), MAX_TREE_DEPTH);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = TreeConfig::from_json_str(r#"{"worker_threads": 0}"#).unwrap_err();
        assert!(matches!(err, TreeError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TreeConfig::from_file("/nonexistent/wtree.json").unwrap_err();
        assert!(err.to_string().starts_with("Config:"));
    }
}
