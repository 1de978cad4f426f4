//! Dynamic Values
//!
//! Component props, setup state, and reactive records are string-keyed bags
//! of loosely typed values. This module defines that value model.
//!
//! # Identity
//!
//! Equality between values follows "same value" semantics rather than
//! structural equality:
//!
//! - Primitives compare by value (floats treat `NaN` as equal to itself and
//!   distinguish `0.0` from `-0.0`).
//! - Strings compare by content.
//! - Objects, lists, refs, and callbacks compare by identity.
//! - Reactive views compare equal when they wrap the same object with the
//!   same flavor, so wrapping an object twice yields equal views.
//!
//! This is what the renderer uses to decide whether a prop changed and what
//! refs use to decide whether a write is a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::reactive::{Reactive, Ref, Runtime};

/// Unique identifier for a raw observed object.
///
/// The Target Map is keyed by this ID rather than by pointer so that an
/// entry can be pruned after the object itself is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A plain, unobserved record of string keys to values.
///
/// Cloning an `Object` clones the handle, not the record. Reads and writes
/// through an `Object` never track or trigger; wrap it with
/// [`reactive`](crate::reactive::reactive) for that.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

struct ObjectData {
    id: ObjectId,
    fields: RefCell<IndexMap<String, Value>>,
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
    }
}

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self(Rc::new(ObjectData {
            id: ObjectId::new(),
            fields: RefCell::new(IndexMap::new()),
        }))
    }

    /// Add a field, builder style.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Read a field without tracking.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow().get(key).cloned()
    }

    /// Write a field without triggering, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        self.0.fields.borrow_mut().insert(key.into(), value)
    }

    /// Remove a field without triggering.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.fields.borrow().contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.fields.borrow().keys().cloned().collect()
    }

    /// Snapshot of all fields in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    /// Check whether two handles point at the same record.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        for (key, value) in iter {
            object.set(key, value);
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id.raw())
            .field("keys", &self.keys())
            .finish()
    }
}

/// A shared event handler or emitted-event callback.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Value])>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invoke the callback with the given arguments.
    pub fn call(&self, args: &[Value]) {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// An immutable list, compared by identity.
    List(Rc<[Value]>),
    /// A raw object.
    Object(Object),
    /// A reactive, readonly, or shallow-readonly view of an object.
    Reactive(Reactive),
    Ref(Ref),
    Callback(Callback),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(c) => Some(c),
            _ => None,
        }
    }

    /// Strip a reactive view down to the object it wraps.
    ///
    /// Every other value is returned unchanged.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Reactive(r) => Value::Object(r.to_raw()),
            other => other.clone(),
        }
    }

    /// Identity comparison, see the module docs.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Callback(a), Value::Callback(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(o) => o.fmt(f),
            Value::Reactive(r) => r.fmt(f),
            Value::Ref(r) => r.fmt(f),
            Value::Callback(c) => c.fmt(f),
        }
    }
}

/// Text rendering used for attribute values and interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(_) | Value::Reactive(_) => f.write_str("[object Object]"),
            Value::Ref(r) => write!(f, "{}", r.get_untracked()),
            Value::Callback(_) => f.write_str("[function]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Reactive(r)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<Callback> for Value {
    fn from(c: Callback) -> Self {
        Value::Callback(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
