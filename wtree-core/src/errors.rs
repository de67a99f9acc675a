//! Error types for `wtree_core`.
//!
//! All fallible operations are funnelled through [`TreeError`], which uses
//! `thiserror` for `Display` and `Error` derives.  Structural no-ops (closing
//! a closed node, deleting a node that is not in the tree) are *not* errors
//! and never show up here.

use thiserror::Error;

/// Top-level error type for the `wtree_core` library.
///
/// Each variant corresponds to a distinct failure family.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A component key could not be resolved by the [`ComponentFactory`].
    ///
    /// [`ComponentFactory`]: crate::factory::ComponentFactory
    #[error("UnknownComponentKind: {0}")]
    UnknownComponentKind(String),

    /// A factory constructor rejected its parameters.
    #[error("ComponentConstruction: {0}")]
    ComponentConstruction(String),

    /// `init` was given a rectangle that is not a valid rectangle.
    #[error("InvalidGeometry: {0}")]
    InvalidGeometry(String),

    /// Attempted to attach a child under a node that is already closed.
    #[error("ParentClosed: node {0} is closed")]
    ParentClosed(u64),

    /// The component is already owned by a node.
    #[error("AlreadyMounted: component is already attached to node {0}")]
    AlreadyMounted(u64),

    /// Attaching would exceed the configured maximum depth.
    #[error("DepthLimit: depth {depth} exceeds maximum {max}")]
    DepthLimit { depth: usize, max: usize },

    /// Configuration could not be read or parsed.
    #[error("Config: {0}")]
    Config(String),

    /// A scene description is malformed.
    #[error("Scene: {0}")]
    Scene(String),
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        TreeError::Config(format!("JSON error: {err}"))
    }
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        TreeError::Config(format!("I/O error: {err}"))
    }
}

/// Shorthand result alias used throughout the crate.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_display() {
        let err = TreeError::UnknownComponentKind("slider".into());
        assert_eq!(err.to_string(), "UnknownComponentKind: slider");
    }

    #[test]
    fn test_depth_limit_display() {
        let err = TreeError::DepthLimit { depth: 9, max: 8 };
        assert!(err.to_string().contains("depth 9 exceeds maximum 8"));
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: TreeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, TreeError::Config(_)));
    }
}
