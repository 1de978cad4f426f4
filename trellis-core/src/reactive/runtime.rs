//! Reactive Runtime
//!
//! The runtime owns the Target Map: observed object → property key →
//! Dependency Set. Reactive views call [`Runtime::track`] on reads and
//! [`Runtime::trigger`] on writes.
//!
//! # How It Works
//!
//! 1. When a reactive view is read inside a running computation, the runtime
//!    finds (or lazily creates) the Dependency Set for `(target, key)` and
//!    subscribes the computation to it.
//!
//! 2. When a reactive view is written, the runtime looks up the Dependency
//!    Set for `(target, key)` and notifies every subscriber synchronously.
//!    A key that was never read has no set, and the write notifies nobody.
//!
//! 3. When a raw object is dropped, its Target Map entry is pruned.
//!
//! # Thread Model
//!
//! The map is thread-local. All reactivity is single-threaded: tracking,
//! triggering, and patching run to completion on the thread that owns the
//! state.

use std::cell::RefCell;
use std::collections::HashMap;

use super::context::ReactiveContext;
use super::dep::Dep;
use crate::value::ObjectId;

type KeyMap = HashMap<String, Dep>;

thread_local! {
    static TARGET_MAP: RefCell<HashMap<ObjectId, KeyMap>> = RefCell::new(HashMap::new());
}

/// The reactive runtime.
///
/// A namespace over the thread-local Target Map.
pub struct Runtime;

impl Runtime {
    /// Subscribe the running computation to `(target, key)`.
    ///
    /// A no-op when no computation is being tracked.
    pub fn track(target: ObjectId, key: &str) {
        if !ReactiveContext::is_active() {
            return;
        }

        let dep = TARGET_MAP.with(|map| {
            map.borrow_mut()
                .entry(target)
                .or_default()
                .entry(key.to_owned())
                .or_default()
                .clone()
        });

        dep.track();
    }

    /// Notify every computation subscribed to `(target, key)`.
    ///
    /// Tolerates a missing set: the key was never read under tracking.
    pub fn trigger(target: ObjectId, key: &str) {
        let dep = Self::dep_for(target, key);

        match dep {
            Some(dep) => dep.trigger(),
            None => tracing::trace!(target = target.raw(), key, "trigger without dependency set"),
        }
    }

    /// Look up the Dependency Set for `(target, key)` without creating it.
    pub fn dep_for(target: ObjectId, key: &str) -> Option<Dep> {
        TARGET_MAP.with(|map| {
            map.borrow()
                .get(&target)
                .and_then(|keys| keys.get(key))
                .cloned()
        })
    }

    /// Whether the Target Map has an entry for `target`.
    pub fn is_tracked(target: ObjectId) -> bool {
        TARGET_MAP.with(|map| map.borrow().contains_key(&target))
    }

    /// Number of objects in the Target Map.
    pub fn tracked_targets() -> usize {
        TARGET_MAP.with(|map| map.borrow().len())
    }

    /// Prune the entry for a dropped object.
    pub(crate) fn forget_target(target: ObjectId) {
        // Dropping the removed sets can drop effects, whose closures may own
        // further objects that call back in here. Release the borrow first.
        // During thread teardown the map may already be gone.
        let removed = TARGET_MAP
            .try_with(|map| {
                map.try_borrow_mut()
                    .ok()
                    .and_then(|mut map| map.remove(&target))
            })
            .ok()
            .flatten();
        drop(removed);
    }
}
