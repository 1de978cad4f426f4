//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a reactive slot is read,
//! we can subscribe the current computation to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an effect pushes it onto the stack
//! and the returned guard pops it on drop, restoring whatever was active
//! before. This keeps nested computations (an effect that reads a computed
//! value, a parent render that mounts a child component) correct.
//!
//! An entry may also be a pause marker. While a pause marker is on top,
//! reads are not tracked even if an outer computation is running.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The running computation, or `None` for a pause marker.
    subscriber: Option<Rc<dyn Subscriber>>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any reactive slot that is read will
    /// register the subscriber as a dependent.
    pub fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber: Some(subscriber),
            });
        });

        Self { subscriber_id }
    }

    /// Suspend tracking until the returned guard is dropped.
    pub fn pause() -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry { subscriber: None });
        });

        Self {
            subscriber_id: None,
        }
    }

    /// Check whether reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// Get the running computation, if tracking is active.
    pub fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        Self::current().map(|subscriber| subscriber.id())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // The stack may already be gone during thread teardown.
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber.as_ref().map(|s| s.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

/// Run `f` without tracking any reads it performs.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::pause();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::dep::Dep;

    struct Probe(SubscriberId);

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.0
        }
        fn notify(&self) {}
        fn is_active(&self) -> bool {
            true
        }
        fn link(&self, _dep: &Dep) {}
    }

    fn probe() -> Rc<dyn Subscriber> {
        Rc::new(Probe(SubscriberId::new()))
    }

    #[test]
    fn context_tracks_subscriber() {
        let sub = probe();
        let id = sub.id();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(sub);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let outer = probe();
        let inner = probe();
        let (id1, id2) = (outer.id(), inner.id());

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
            }

            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_pauses_outer_context() {
        let _ctx = ReactiveContext::enter(probe());
        assert!(ReactiveContext::is_active());

        untracked(|| {
            assert!(!ReactiveContext::is_active());
            assert!(ReactiveContext::current().is_none());
        });

        assert!(ReactiveContext::is_active());
    }
}
