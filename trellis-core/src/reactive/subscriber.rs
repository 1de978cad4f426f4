//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values.
//! This includes plain effects, the private effect behind a computed value,
//! and component render effects.

use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Dependency Sets are keyed
/// by this ID, which keeps subscription idempotent. The job queue also uses
/// it to deduplicate scheduled re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be subscribed to Dependency Sets.
///
/// The object-safe seam between the tracker and the effect implementation:
/// a [`Dep`] only ever sees `Rc<dyn Subscriber>`.
pub trait Subscriber {
    /// Get the subscriber ID.
    fn id(&self) -> SubscriberId;

    /// React to a dependency change: invoke the scheduler if there is one,
    /// otherwise re-run directly.
    fn notify(&self);

    /// Whether the subscriber still accepts notifications.
    fn is_active(&self) -> bool;

    /// Record `dep` in the subscriber's back-reference set.
    fn link(&self, dep: &Dep);
}
