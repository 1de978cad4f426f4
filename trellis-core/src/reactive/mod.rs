//! Reactive Primitives
//!
//! This module implements the reactivity core: reactive views over plain
//! objects, refs, computed values, and effects. Everything the renderer
//! keeps up to date is built on these.
//!
//! # Concepts
//!
//! ## Target Map
//!
//! Every reactive object read inside a running effect registers the effect
//! in a Dependency Set keyed by `(object, property)`. The [`Runtime`] owns
//! that map. Writes look up the set and notify its subscribers.
//!
//! ## Reactive Views
//!
//! [`reactive`], [`readonly`], and [`shallow_readonly`] wrap an [`Object`]
//! so that reads track and writes trigger. Wrapping is lazy: a nested object
//! is wrapped when it is read.
//!
//! ## Refs
//!
//! A [`Ref`] is a single reactive cell with its own Dependency Set.
//! [`ProxyRefs`] unwraps refs stored in a record, which is how component
//! state is exposed to render code.
//!
//! ## Effects
//!
//! An effect runs its function immediately and again whenever something it
//! read changes. Dependencies are cleaned and re-collected on every run, so
//! a branch that stops being read stops triggering. An effect with a
//! scheduler hands notifications to the scheduler instead of re-running.
//!
//! ## Computed
//!
//! A [`Computed`] is a lazily evaluated cached value built on an effect whose
//! scheduler marks it dirty.
//!
//! # Implementation Notes
//!
//! Tracking uses a thread-local stack of active computations. Entering an
//! effect pushes it; nested effects push on top and restore the outer one
//! when they finish. All state is single-threaded and lives in `Rc`/`RefCell`.
//!
//! [`Object`]: crate::value::Object

mod computed;
mod context;
mod dep;
mod effect;
mod proxy;
mod reference;
mod runtime;
mod subscriber;

pub use computed::{computed, Computed};
pub use context::{untracked, ReactiveContext};
pub use dep::{Dep, DepId, WeakDep};
pub use effect::{
    effect, effect_with, stop, EffectOptions, EffectRunner, ReactiveEffect, Scheduler,
};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, is_shallow_readonly, reactive, readonly,
    shallow_readonly, to_raw, Flavor, Reactive, IS_REACTIVE, IS_READONLY, IS_SHALLOW_READONLY,
};
pub use reference::{is_ref, proxy_refs, unref, ProxyRefs, Ref};
pub use runtime::Runtime;
pub use subscriber::{Subscriber, SubscriberId};
