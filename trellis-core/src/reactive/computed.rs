//! Computed Implementation
//!
//! A [`Computed`] is a cached derived value that re-evaluates only when one
//! of its dependencies changes, and only when it is read.
//!
//! # How Computed Values Work
//!
//! 1. The getter is wrapped in a private effect whose scheduler only marks
//!    the computed dirty. It never recomputes eagerly.
//!
//! 2. Reading [`Computed::get`] while dirty runs the effect, which both
//!    recomputes and re-establishes fresh dependency tracking, then caches
//!    the result and clears the flag.
//!
//! 3. Reading while clean returns the cached value.
//!
//! A computed value is itself observable: computations that read it are
//! notified when it turns dirty.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::dep::Dep;
use super::effect::{EffectOptions, ReactiveEffect};

/// A lazily evaluated, memoized derived value.
///
/// Cloning shares the same cache.
pub struct Computed<T: Clone + 'static> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T: Clone + 'static> {
    dirty: Rc<Cell<bool>>,
    value: RefCell<Option<T>>,
    effect: ReactiveEffect<T>,
    dep: Dep,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value. The getter does not run until the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let dirty = Rc::new(Cell::new(true));
        let dep = Dep::new();

        let scheduler = {
            let dirty = dirty.clone();
            let dep = dep.downgrade();
            move || {
                if !dirty.replace(true) {
                    if let Some(dep) = dep.upgrade() {
                        dep.trigger();
                    }
                }
            }
        };

        let effect = ReactiveEffect::new(getter, EffectOptions::new().scheduler(scheduler));

        Self {
            inner: Rc::new(ComputedInner {
                dirty,
                value: RefCell::new(None),
                effect,
                dep,
            }),
        }
    }

    /// Get the value, recomputing first if a dependency changed.
    pub fn get(&self) -> T {
        self.inner.dep.track();

        if !self.inner.dirty.get() {
            if let Some(value) = self.inner.value.borrow().as_ref() {
                return value.clone();
            }
        }

        self.inner.dirty.set(false);
        let value = self.inner.effect.run();
        *self.inner.value.borrow_mut() = Some(value.clone());
        value
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Check if a value has been computed yet.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Stop tracking dependencies. The cached value stays readable.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.is_dirty())
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Shorthand for [`Computed::new`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
