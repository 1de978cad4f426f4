//! Provide / Inject
//!
//! Every component instance sees an injection chain: a linked list of
//! scopes walked from the instance toward the application root. An
//! instance shares its parent's chain until it first calls [`provide`],
//! at which point it pushes its own scope on top. [`inject`] looks up the
//! chain the instance inherited, so the nearest ancestor that provided a
//! key wins and an instance never sees its own provides.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::{current_instance, ComponentInstance};
use crate::value::Value;
use crate::warn::warn;

/// One link of an injection chain. Cloning shares the chain.
#[derive(Clone, Default)]
pub struct Provides(Option<Rc<Scope>>);

struct Scope {
    values: RefCell<IndexMap<String, Value>>,
    parent: Provides,
}

impl Provides {
    /// A fresh chain with one empty scope.
    pub fn root() -> Self {
        Provides::default().child()
    }

    /// A new empty scope on top of this chain.
    pub fn child(&self) -> Self {
        Provides(Some(Rc::new(Scope {
            values: RefCell::new(IndexMap::new()),
            parent: self.clone(),
        })))
    }

    /// Store `value` in the topmost scope. Returns false for an empty chain.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        match &self.0 {
            Some(scope) => {
                scope.values.borrow_mut().insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// Find `key`, nearest scope first.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let mut cursor = self;
        while let Some(scope) = &cursor.0 {
            if let Some(value) = scope.values.borrow().get(key) {
                return Some(value.clone());
            }
            cursor = &scope.parent;
        }
        None
    }

    pub fn ptr_eq(&self, other: &Provides) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Provides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut cursor = self;
        while let Some(scope) = &cursor.0 {
            depth += 1;
            cursor = &scope.parent;
        }
        f.debug_struct("Provides").field("depth", &depth).finish()
    }
}

impl ComponentInstance {
    /// Make `value` injectable under `key` by this instance's descendants.
    pub fn provide(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut provides = self.provides.borrow_mut();
        if provides.ptr_eq(&self.inherited) {
            *provides = self.inherited.child();
        }
        provides.insert(key, value.into());
    }

    /// Resolve `key` from the nearest ancestor that provided it.
    pub fn inject(&self, key: &str) -> Option<Value> {
        self.inherited.lookup(key)
    }
}

/// Provide `value` from the component whose setup is running.
pub fn provide(key: impl Into<String>, value: impl Into<Value>) {
    match current_instance() {
        Some(instance) => instance.provide(key, value),
        None => warn("provide() can only be used inside setup()"),
    }
}

/// Inject `key` into the component whose setup is running.
///
/// Returns `None` when no ancestor provided it.
pub fn inject(key: &str) -> Option<Value> {
    match current_instance() {
        Some(instance) => instance.inject(key),
        None => {
            warn("inject() can only be used inside setup()");
            None
        }
    }
}

/// [`inject`] with a default for unresolved keys.
pub fn inject_or(key: &str, default: impl Into<Value>) -> Value {
    inject(key).unwrap_or_else(|| default.into())
}

/// [`inject`] with a lazily computed default.
pub fn inject_with(key: &str, default: impl FnOnce() -> Value) -> Value {
    inject(key).unwrap_or_else(default)
}
