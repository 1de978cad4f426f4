//! Reactive Views
//!
//! A [`Reactive`] wraps a raw [`Object`] so that reads go through a getter
//! and writes through a setter. There are three flavors, all served by the
//! same getter/setter parameterized by `(readonly, shallow)`:
//!
//! | flavor | tracks reads | accepts writes | wraps nested objects |
//! |---|---|---|---|
//! | `Reactive` | yes | yes, and triggers | as `Reactive` |
//! | `Readonly` | no | no, warns | as `Readonly` |
//! | `ShallowReadonly` | no | no, warns | no |
//!
//! Nested wrapping is lazy: an inner object is wrapped when it is read, not
//! when the outer object is wrapped.
//!
//! # Identity
//!
//! A view is a `(target, flavor)` pair, and two views are equal when both
//! parts are. Wrapping the same object twice therefore produces equal
//! views, and [`Reactive::to_raw`] always recovers the original object.

use std::fmt;

use super::runtime::Runtime;
use crate::value::{Object, Value};
use crate::warn::warn;

/// Reserved key answering whether a value is a mutable reactive view.
pub const IS_REACTIVE: &str = "__v_isReactive";
/// Reserved key answering whether a value is a readonly view.
pub const IS_READONLY: &str = "__v_isReadonly";
/// Reserved key answering whether a value is a shallow readonly view.
pub const IS_SHALLOW_READONLY: &str = "__v_isShallowReadonly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Reactive,
    Readonly,
    ShallowReadonly,
}

impl Flavor {
    pub fn is_readonly(self) -> bool {
        matches!(self, Flavor::Readonly | Flavor::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, Flavor::ShallowReadonly)
    }

    /// Flavor given to nested objects read through this one.
    fn nested(self) -> Flavor {
        if self.is_readonly() {
            Flavor::Readonly
        } else {
            Flavor::Reactive
        }
    }
}

/// A reactive, readonly, or shallow-readonly view of an [`Object`].
#[derive(Clone)]
pub struct Reactive {
    target: Object,
    flavor: Flavor,
}

impl Reactive {
    pub fn new(target: &Object, flavor: Flavor) -> Self {
        Self {
            target: target.clone(),
            flavor,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The wrapped object.
    pub fn to_raw(&self) -> Object {
        self.target.clone()
    }

    /// Read `key`. Missing keys read as [`Value::Null`].
    pub fn get(&self, key: &str) -> Value {
        match key {
            IS_REACTIVE => return Value::Bool(!self.flavor.is_readonly()),
            IS_READONLY => return Value::Bool(self.flavor.is_readonly()),
            IS_SHALLOW_READONLY => return Value::Bool(self.flavor.is_shallow()),
            _ => {}
        }

        let value = self.target.get(key).unwrap_or_default();

        if self.flavor.is_shallow() {
            return value;
        }

        if !self.flavor.is_readonly() {
            Runtime::track(self.target.id(), key);
        }

        match value {
            Value::Object(nested) => Value::Reactive(Reactive::new(&nested, self.flavor.nested())),
            Value::Reactive(nested) => {
                Value::Reactive(Reactive::new(&nested.target, self.flavor.nested()))
            }
            other => other,
        }
    }

    /// Write `key`.
    ///
    /// Readonly views drop the write and report it on the warning channel.
    /// Otherwise the raw value is stored, and subscribers are notified when
    /// the key is new or its value changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        if self.flavor.is_readonly() {
            warn(format!("set operation on key \"{key}\" failed: target is readonly"));
            return;
        }

        let value = value.into().to_raw();
        let previous = self.target.set(key, value.clone());

        if previous.map_or(true, |previous| !previous.same_value(&value)) {
            Runtime::trigger(self.target.id(), key);
        }
    }

    /// Read-modify-write, e.g. incrementing a counter.
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
        let next = f(self.get(key));
        self.set(key, next);
    }

    /// Remove `key`, notifying subscribers if it was present.
    pub fn remove(&self, key: &str) {
        if self.flavor.is_readonly() {
            warn(format!("delete operation on key \"{key}\" failed: target is readonly"));
            return;
        }

        if self.target.remove(key).is_some() {
            Runtime::trigger(self.target.id(), key);
        }
    }

    /// Whether `key` is present. Tracked like a read.
    pub fn has(&self, key: &str) -> bool {
        if !self.flavor.is_readonly() {
            Runtime::track(self.target.id(), key);
        }
        self.target.contains_key(key)
    }

    /// Field names, untracked.
    pub fn keys(&self) -> Vec<String> {
        self.target.keys()
    }

    pub fn is_reactive(&self) -> bool {
        self.get(IS_REACTIVE).as_bool() == Some(true)
    }

    pub fn is_readonly(&self) -> bool {
        self.get(IS_READONLY).as_bool() == Some(true)
    }

    pub fn is_shallow_readonly(&self) -> bool {
        self.get(IS_SHALLOW_READONLY).as_bool() == Some(true)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target) && self.flavor == other.flavor
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("flavor", &self.flavor)
            .field("target", &self.target)
            .finish()
    }
}

/// Deep, tracked, writable view of `target`.
pub fn reactive(target: &Object) -> Reactive {
    Reactive::new(target, Flavor::Reactive)
}

/// Deep, untracked, write-refusing view of `target`.
pub fn readonly(target: &Object) -> Reactive {
    Reactive::new(target, Flavor::Readonly)
}

/// Untracked, write-refusing view of `target` whose nested values are
/// returned as-is.
pub fn shallow_readonly(target: &Object) -> Reactive {
    Reactive::new(target, Flavor::ShallowReadonly)
}

fn flag(value: &Value, key: &str) -> bool {
    value
        .as_reactive()
        .is_some_and(|view| view.get(key).as_bool() == Some(true))
}

pub fn is_reactive(value: &Value) -> bool {
    flag(value, IS_REACTIVE)
}

pub fn is_readonly(value: &Value) -> bool {
    flag(value, IS_READONLY)
}

pub fn is_shallow_readonly(value: &Value) -> bool {
    flag(value, IS_SHALLOW_READONLY)
}

/// Whether `value` is any kind of view.
pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// See [`Value::to_raw`].
pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}
