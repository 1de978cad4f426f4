//! Effect Implementation
//!
//! An Effect (Computation Unit) is a re-runnable function whose reactive
//! reads are tracked, so that it is notified when any of them change.
//!
//! # How Effects Work
//!
//! 1. [`effect`] runs the function once, immediately, to collect its
//!    dependencies, and returns an [`EffectRunner`].
//!
//! 2. When a dependency changes, the effect's scheduler is invoked if it has
//!    one; otherwise the effect re-runs directly.
//!
//! 3. Before every tracked run the effect leaves all the Dependency Sets it
//!    joined last time, so a branch that is no longer taken stops tracking.
//!
//! # Lifecycle
//!
//! `Active` → `Stopped`, via [`ReactiveEffect::stop`]. Stopping leaves every
//! Dependency Set and fires the `on_stop` callback once. A stopped effect
//! can still be run by hand; it just doesn't track anything.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId, WeakDep};
use super::subscriber::{Subscriber, SubscriberId};

/// Callback substituted for a direct re-run when a dependency changes.
pub type Scheduler = Rc<dyn Fn()>;

/// Options for [`effect_with`] and [`ReactiveEffect::new`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    scheduler: Option<Scheduler>,
    on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `scheduler` instead of re-running when a dependency changes.
    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Invoke `on_stop` once when the effect is stopped.
    pub fn on_stop(mut self, on_stop: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(on_stop));
        self
    }
}

/// A tracked, re-runnable computation returning `R`.
///
/// Cloning shares the same underlying effect.
pub struct ReactiveEffect<R: 'static> {
    inner: Rc<EffectInner<R>>,
}

struct EffectInner<R: 'static> {
    id: SubscriberId,
    this: Weak<EffectInner<R>>,
    func: Box<dyn Fn() -> R>,
    scheduler: Option<Scheduler>,
    on_stop: RefCell<Option<Rc<dyn Fn()>>>,
    active: Cell<bool>,
    running: Cell<bool>,
    /// Back-references to every Dependency Set this effect is in.
    deps: RefCell<IndexMap<DepId, WeakDep>>,
    run_count: Cell<usize>,
}

impl<R: 'static> ReactiveEffect<R> {
    /// Create an effect without running it.
    pub fn new<F>(func: F, options: EffectOptions) -> Self
    where
        F: Fn() -> R + 'static,
    {
        let inner = Rc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            this: this.clone(),
            func: Box::new(func),
            scheduler: options.scheduler,
            on_stop: RefCell::new(options.on_stop),
            active: Cell::new(true),
            running: Cell::new(false),
            deps: RefCell::new(IndexMap::new()),
            run_count: Cell::new(0),
        });

        Self { inner }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the function, tracking its reads while active.
    pub fn run(&self) -> R {
        self.inner.run()
    }

    /// Leave every Dependency Set and stop reacting. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Whether the function is executing right now.
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of Dependency Sets the effect is currently in.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub fn has_scheduler(&self) -> bool {
        self.inner.scheduler.is_some()
    }
}

impl<R: 'static> EffectInner<R> {
    fn run(&self) -> R {
        if !self.active.get() {
            return (self.func)();
        }

        let Some(this) = self.this.upgrade() else {
            return (self.func)();
        };

        self.cleanup();

        let _ctx = ReactiveContext::enter(this);
        let was_running = self.running.replace(true);
        let result = (self.func)();
        self.running.set(was_running);
        self.run_count.set(self.run_count.get() + 1);

        result
    }

    /// Leave every Dependency Set, keeping the effect active.
    fn cleanup(&self) {
        let deps: Vec<WeakDep> = self.deps.borrow_mut().drain(..).map(|(_, d)| d).collect();
        for dep in deps {
            if let Some(dep) = dep.upgrade() {
                dep.remove(self.id);
            }
        }
    }

    fn stop(&self) {
        if !self.active.get() {
            return;
        }

        self.cleanup();
        self.active.set(false);
        tracing::debug!(effect = self.id.raw(), "effect stopped");

        let on_stop = self.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }
}

impl<R: 'static> Subscriber for EffectInner<R> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self) {
        if !self.active.get() {
            return;
        }

        if let Some(scheduler) = &self.scheduler {
            scheduler();
        } else if self.running.get() {
            // Writing a key the effect is reading during its own run.
            tracing::trace!(effect = self.id.raw(), "skipping recursive run");
        } else {
            self.run();
        }
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn link(&self, dep: &Dep) {
        self.deps.borrow_mut().insert(dep.id(), dep.downgrade());
    }
}

impl<R: 'static> Clone for ReactiveEffect<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: 'static> fmt::Debug for ReactiveEffect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handle returned by [`effect`].
///
/// Calling [`run`](EffectRunner::run) forces a direct re-run that bypasses
/// the scheduler.
pub struct EffectRunner<R: 'static> {
    effect: ReactiveEffect<R>,
}

impl<R: 'static> EffectRunner<R> {
    pub fn run(&self) -> R {
        self.effect.run()
    }

    /// The underlying effect.
    pub fn effect(&self) -> &ReactiveEffect<R> {
        &self.effect
    }

    pub fn id(&self) -> SubscriberId {
        self.effect.id()
    }

    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl<R: 'static> From<ReactiveEffect<R>> for EffectRunner<R> {
    fn from(effect: ReactiveEffect<R>) -> Self {
        Self { effect }
    }
}

impl<R: 'static> Clone for EffectRunner<R> {
    fn clone(&self) -> Self {
        Self {
            effect: self.effect.clone(),
        }
    }
}

impl<R: 'static> fmt::Debug for EffectRunner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EffectRunner").field(&self.effect).finish()
    }
}

/// Create an effect and run it once.
pub fn effect<R, F>(func: F) -> EffectRunner<R>
where
    R: 'static,
    F: Fn() -> R + 'static,
{
    effect_with(func, EffectOptions::default())
}

/// Create an effect with a scheduler and/or stop callback and run it once.
pub fn effect_with<R, F>(func: F, options: EffectOptions) -> EffectRunner<R>
where
    R: 'static,
    F: Fn() -> R + 'static,
{
    let effect = ReactiveEffect::new(func, options);
    effect.run();
    EffectRunner { effect }
}

/// Stop the effect behind `runner`.
pub fn stop<R: 'static>(runner: &EffectRunner<R>) {
    runner.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
