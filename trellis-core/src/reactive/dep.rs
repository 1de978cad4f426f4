//! Dependency Sets
//!
//! A [`Dep`] is the set of computations subscribed to one reactive slot: a
//! `(target, key)` pair of a reactive object, the private slot of a ref, or
//! the output of a computed value.
//!
//! Membership is symmetric: a subscriber is in a `Dep` exactly when that
//! `Dep` is in the subscriber's back-reference set. The back-reference lets
//! a subscriber leave all its sets when it stops or re-runs without scanning
//! the Target Map.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// Unique identifier for a Dependency Set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u64);

impl DepId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A set of subscribers, iterated in subscription order.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

struct DepInner {
    id: DepId,
    subscribers: RefCell<IndexMap<SubscriberId, Rc<dyn Subscriber>>>,
}

/// Non-owning handle kept in a subscriber's back-reference set.
#[derive(Clone)]
pub struct WeakDep(Weak<DepInner>);

impl WeakDep {
    pub fn upgrade(&self) -> Option<Dep> {
        self.0.upgrade().map(Dep)
    }
}

impl Dep {
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::new(),
            subscribers: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    pub fn downgrade(&self) -> WeakDep {
        WeakDep(Rc::downgrade(&self.0))
    }

    /// Subscribe the running computation, if any.
    ///
    /// Returns whether anything was tracked.
    pub fn track(&self) -> bool {
        match ReactiveContext::current() {
            Some(subscriber) => {
                self.add(subscriber);
                true
            }
            None => false,
        }
    }

    /// Subscribe `subscriber` and record the back-reference. Idempotent.
    pub fn add(&self, subscriber: Rc<dyn Subscriber>) {
        let id = subscriber.id();
        let inserted = {
            let mut subscribers = self.0.subscribers.borrow_mut();
            if subscribers.contains_key(&id) {
                false
            } else {
                subscribers.insert(id, subscriber.clone());
                true
            }
        };
        if inserted {
            subscriber.link(self);
        }
    }

    /// Unsubscribe by ID. The caller is responsible for its own
    /// back-reference set.
    pub fn remove(&self, id: SubscriberId) {
        // Dropping the removed Rc may run arbitrary destructors, so do it
        // after the borrow is released.
        let removed = self.0.subscribers.borrow_mut().shift_remove(&id);
        drop(removed);
    }

    /// Notify every subscriber, in subscription order.
    ///
    /// Iterates over a snapshot, so subscribers may re-subscribe or leave
    /// during the fan-out. A subscriber stopped by an earlier one in the
    /// same fan-out is skipped.
    pub fn trigger(&self) {
        let snapshot: SmallVec<[Rc<dyn Subscriber>; 4]> =
            self.0.subscribers.borrow().values().cloned().collect();

        tracing::trace!(dep = ?self.0.id, count = snapshot.len(), "trigger");

        for subscriber in snapshot {
            if subscriber.is_active() {
                subscriber.notify();
            }
        }
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.0.subscribers.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.subscribers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.subscribers.borrow().is_empty()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        id: SubscriberId,
        notified: Cell<usize>,
        linked: Cell<usize>,
    }

    impl Subscriber for Counter {
        fn id(&self) -> SubscriberId {
            self.id
        }
        fn notify(&self) {
            self.notified.set(self.notified.get() + 1);
        }
        fn is_active(&self) -> bool {
            true
        }
        fn link(&self, _dep: &Dep) {
            self.linked.set(self.linked.get() + 1);
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter {
            id: SubscriberId::new(),
            notified: Cell::new(0),
            linked: Cell::new(0),
        })
    }

    #[test]
    fn add_is_idempotent() {
        let dep = Dep::new();
        let sub = counter();

        dep.add(sub.clone());
        dep.add(sub.clone());

        assert_eq!(dep.len(), 1);
        assert_eq!(sub.linked.get(), 1);
    }

    #[test]
    fn trigger_notifies_each_subscriber_once() {
        let dep = Dep::new();
        let a = counter();
        let b = counter();
        dep.add(a.clone());
        dep.add(b.clone());

        dep.trigger();

        assert_eq!(a.notified.get(), 1);
        assert_eq!(b.notified.get(), 1);
    }

    #[test]
    fn track_outside_context_is_noop() {
        let dep = Dep::new();
        assert!(!dep.track());
        assert!(dep.is_empty());
    }

    #[test]
    fn track_inside_context_subscribes() {
        let dep = Dep::new();
        let sub = counter();
        {
            let _ctx = ReactiveContext::enter(sub.clone());
            assert!(dep.track());
        }
        assert!(dep.contains(sub.id));
    }

    #[test]
    fn remove_unsubscribes() {
        let dep = Dep::new();
        let sub = counter();
        dep.add(sub.clone());

        dep.remove(sub.id);
        dep.trigger();

        assert!(dep.is_empty());
        assert_eq!(sub.notified.get(), 0);
    }
}
