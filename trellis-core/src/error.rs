//! Renderer errors.

use thiserror::Error;

/// A failure while mounting or patching a tree.
///
/// Reactive operations never fail. Readonly violations and unresolved
/// injections go through [`crate::warn`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A component has neither a render function from `setup` nor one on
    /// its definition.
    #[error("component `{component}` is missing a render function")]
    MissingRender { component: String },

    /// A node that must already be mounted has no host handle.
    #[error("{kind} node is not mounted")]
    Unmounted { kind: &'static str },

    /// An internal invariant of the renderer did not hold.
    #[error("renderer invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
