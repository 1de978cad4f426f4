//! Host Adapter Contract
//!
//! The renderer never touches a real output tree. It talks to a [`Host`],
//! which owns the nodes and hands out opaque [`HostHandle`]s. A browser DOM,
//! a terminal UI, or the in-memory [`TestHost`](crate::testing::TestHost)
//! can all sit behind this trait.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Opaque identifier of a node owned by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostHandle(u64);

impl HostHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for HostHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Operations the renderer needs from its output tree.
///
/// All methods take `&self`; hosts use interior mutability. Every call
/// happens on the renderer's thread.
pub trait Host {
    /// Create a detached element.
    fn create_element(&self, tag: &str) -> HostHandle;

    /// Create a detached text node.
    fn create_text(&self, text: &str) -> HostHandle;

    /// Apply one attribute or listener. `next` of `None` or [`Value::Null`]
    /// removes it. Keys accepted by [`is_event_key`] are listeners.
    fn patch_prop(&self, el: HostHandle, key: &str, prev: Option<&Value>, next: Option<&Value>);

    /// Insert `child` into `parent` before `anchor`, or append when `anchor`
    /// is `None`. An attached child is moved.
    fn insert(&self, child: HostHandle, parent: HostHandle, anchor: Option<HostHandle>);

    /// Detach `child` from its parent. No-op if already detached.
    fn remove(&self, child: HostHandle);

    /// Replace all content of `el` with plain text.
    fn set_text(&self, el: HostHandle, text: &str);

    /// The node following `node` in its parent, if any.
    fn next_sibling(&self, node: HostHandle) -> Option<HostHandle>;
}

/// Whether a prop key names an event listener: `on` followed by an
/// uppercase letter, e.g. `onClick`.
pub fn is_event_key(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// The event name for a listener key: `onClick` → `click`.
pub fn event_name(key: &str) -> Option<String> {
    if !is_event_key(key) {
        return None;
    }
    key.strip_prefix("on").map(str::to_lowercase)
}
