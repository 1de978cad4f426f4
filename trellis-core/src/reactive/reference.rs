//! Ref Implementation
//!
//! A [`Ref`] is a single reactive cell. Unlike a reactive object it is not
//! keyed through the Target Map: it owns one private Dependency Set.
//!
//! # How Refs Work
//!
//! 1. Reading with [`Ref::get`] subscribes the running computation.
//!
//! 2. Writing with [`Ref::set`] compares the new raw value with the stored
//!    raw value. An identical write is a no-op; anything else stores the
//!    value and notifies subscribers once.
//!
//! 3. Object values are exposed through a reactive view, while the raw
//!    object is kept for the comparison in step 2.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::dep::Dep;
use super::proxy::reactive;
use crate::value::{Object, Value};

/// A reactive cell holding one [`Value`].
///
/// Cloning shares the same cell.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

struct RefInner {
    raw: RefCell<Value>,
    value: RefCell<Value>,
    dep: Dep,
}

fn to_reactive(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Reactive(reactive(object)),
        other => other.clone(),
    }
}

impl Ref {
    pub fn new(value: impl Into<Value>) -> Self {
        let raw = value.into().to_raw();
        let value = to_reactive(&raw);

        Self(Rc::new(RefInner {
            raw: RefCell::new(raw),
            value: RefCell::new(value),
            dep: Dep::new(),
        }))
    }

    /// Get the current value, subscribing the running computation.
    pub fn get(&self) -> Value {
        self.0.dep.track();
        self.get_untracked()
    }

    pub fn get_untracked(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Set a new value, notifying subscribers unless it is the same value.
    pub fn set(&self, value: impl Into<Value>) {
        let raw = value.into().to_raw();
        if raw.same_value(&self.0.raw.borrow()) {
            return;
        }

        *self.0.value.borrow_mut() = to_reactive(&raw);
        *self.0.raw.borrow_mut() = raw;

        self.0.dep.trigger();
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(Value) -> Value) {
        let next = f(self.get_untracked());
        self.set(next);
    }

    /// Number of computations subscribed to this ref.
    pub fn subscriber_count(&self) -> usize {
        self.0.dep.len()
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &*self.0.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The value inside a ref (tracked), or `value` itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

/// A view over a state record that unwraps refs on read and forwards plain
/// writes into an existing ref.
///
/// This is how a component's setup state is exposed to its render code.
#[derive(Clone, Debug)]
pub struct ProxyRefs {
    target: Object,
}

impl ProxyRefs {
    pub fn new(target: &Object) -> Self {
        Self {
            target: target.clone(),
        }
    }

    /// Read `key`, unwrapping a ref.
    pub fn get(&self, key: &str) -> Value {
        self.target
            .get(key)
            .map(|value| unref(&value))
            .unwrap_or_default()
    }

    /// Write `key`. A plain value written over a ref goes into the ref.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.target.get(key) {
            Some(Value::Ref(existing)) if !is_ref(&value) => existing.set(value),
            _ => {
                self.target.set(key, value);
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.target.contains_key(key)
    }

    pub fn to_raw(&self) -> Object {
        self.target.clone()
    }
}

pub fn proxy_refs(target: &Object) -> ProxyRefs {
    ProxyRefs::new(target)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
