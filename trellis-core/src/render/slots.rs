//! Component slots.
//!
//! Children passed to a component are normalized into named slot
//! functions. A plain child list becomes the `default` slot.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::vnode::{fragment, text, Children, VNode};
use crate::value::Object;

/// Name of the slot that receives a component's plain children.
pub const DEFAULT_SLOT: &str = "default";

/// Produces a slot's nodes from the props the component passes to it.
pub type SlotFn = Rc<dyn Fn(&Object) -> Vec<VNode>>;

#[derive(Clone, Default)]
pub struct Slots {
    slots: IndexMap<String, SlotFn>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize component children into slots.
    pub fn from_children(children: &Children) -> Self {
        match children {
            Children::None => Self::new(),
            Children::Slots(slots) => slots.clone(),
            Children::List(list) => {
                let list = list.clone();
                let mut slots = Self::new();
                slots.insert(DEFAULT_SLOT, move |_| list.clone());
                slots
            }
            Children::Text(content) => {
                let content = content.clone();
                let mut slots = Self::new();
                slots.insert(DEFAULT_SLOT, move |_| vec![text(&content)]);
                slots
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: impl Fn(&Object) -> Vec<VNode> + 'static) {
        self.slots.insert(name.into(), Rc::new(slot));
    }

    pub fn get(&self, name: &str) -> Option<&SlotFn> {
        self.slots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.keys()).finish()
    }
}

/// Render slot `name` into a Fragment. A missing slot renders an empty
/// Fragment.
pub fn render_slot(slots: &Slots, name: &str, props: &Object) -> VNode {
    let children = slots.get(name).map(|slot| slot(props)).unwrap_or_default();
    fragment(children)
}
