//! Virtual Nodes
//!
//! A [`VNode`] describes one rendered unit: an element, a text node, a
//! fragment, or a component. Nodes are immutable by convention once built,
//! except for the host bookkeeping the renderer fills in while mounting
//! (`el`, the fragment end `anchor`, and the component instance).
//!
//! # Building Nodes
//!
//! ```rust,ignore
//! use trellis_core::render::{h, text};
//!
//! let list = h("ul")
//!     .children(items.iter().map(|item| h("li").key(item.id).text(&item.label)))
//!     .build();
//! ```
//!
//! `VNode` is a cheap handle: cloning shares the node. A node may appear in
//! at most one place of a mounted tree at a time.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::{Component, ComponentInstance};
use super::host::HostHandle;
use super::slots::Slots;
use crate::value::{Object, Value};

/// String-keyed attribute and listener map.
pub type Props = IndexMap<String, Value>;

/// Diffing identity of a node among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl From<i64> for Key {
    fn from(key: i64) -> Self {
        Key::Int(key)
    }
}

impl From<i32> for Key {
    fn from(key: i32) -> Self {
        Key::Int(key.into())
    }
}

impl From<usize> for Key {
    fn from(key: usize) -> Self {
        Key::Int(key as i64)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key::Str(key.into())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key::Str(key.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(key) => write!(f, "{key}"),
            Key::Str(key) => f.write_str(key),
        }
    }
}

/// What a node renders as.
#[derive(Clone)]
pub enum VNodeType {
    Element(Rc<str>),
    Component(Rc<Component>),
    Fragment,
    Text,
}

impl VNodeType {
    pub fn kind(&self) -> &'static str {
        match self {
            VNodeType::Element(_) => "element",
            VNodeType::Component(_) => "component",
            VNodeType::Fragment => "fragment",
            VNodeType::Text => "text",
        }
    }
}

impl PartialEq for VNodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => Rc::ptr_eq(a, b),
            (VNodeType::Fragment, VNodeType::Fragment) => true,
            (VNodeType::Text, VNodeType::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "Element({tag})"),
            VNodeType::Component(component) => write!(f, "Component({})", component.name()),
            VNodeType::Fragment => f.write_str("Fragment"),
            VNodeType::Text => f.write_str("Text"),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.into())
    }
}

impl From<Rc<Component>> for VNodeType {
    fn from(component: Rc<Component>) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Rc<Component>> for VNodeType {
    fn from(component: &Rc<Component>) -> Self {
        VNodeType::Component(Rc::clone(component))
    }
}

/// A node's children.
#[derive(Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    List(Vec<VNode>),
    /// Slot payload for a component node.
    Slots(Slots),
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::None => f.write_str("None"),
            Children::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Children::List(list) => f.debug_list().entries(list).finish(),
            Children::Slots(slots) => f.debug_tuple("Slots").field(slots).finish(),
        }
    }
}

/// A virtual node.
#[derive(Clone)]
pub struct VNode(Rc<VNodeInner>);

struct VNodeInner {
    ty: VNodeType,
    props: Rc<Props>,
    children: Children,
    key: Option<Key>,
    el: Cell<Option<HostHandle>>,
    anchor: Cell<Option<HostHandle>>,
    component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    pub fn ty(&self) -> &VNodeType {
        &self.0.ty
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.0.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.0.props.get(key)
    }

    pub fn children(&self) -> &Children {
        &self.0.children
    }

    /// Child nodes, or an empty slice when children are not a list.
    pub fn child_list(&self) -> &[VNode] {
        match &self.0.children {
            Children::List(list) => list,
            _ => &[],
        }
    }

    /// Text children, if any.
    pub fn text_content(&self) -> Option<&str> {
        match &self.0.children {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    /// Host handle of the first host node this vnode rendered.
    pub fn el(&self) -> Option<HostHandle> {
        self.0.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<HostHandle>) {
        self.0.el.set(el);
    }

    /// End anchor of a mounted fragment.
    pub fn anchor(&self) -> Option<HostHandle> {
        self.0.anchor.get()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<HostHandle>) {
        self.0.anchor.set(anchor);
    }

    /// The mounted instance of a component node.
    pub fn component(&self) -> Option<Rc<ComponentInstance>> {
        self.0.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Option<Rc<ComponentInstance>>) {
        *self.0.component.borrow_mut() = instance;
    }

    /// Props as a fresh raw object.
    pub fn props_object(&self) -> Object {
        self.0
            .props
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.0.ty);
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        if !self.0.props.is_empty() {
            s.field("props", &self.0.props.keys().collect::<Vec<_>>());
        }
        s.field("children", &self.0.children);
        s.finish()
    }
}

/// Same type and same key: the node can be patched in place.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.ty() == b.ty() && a.key() == b.key()
}

/// Builder returned by [`h`].
pub struct VNodeBuilder {
    ty: VNodeType,
    props: Props,
    children: Children,
    key: Option<Key>,
}

impl VNodeBuilder {
    /// Set one prop. The `key` prop sets the diffing key instead.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();

        if key == "key" {
            self.key = match value {
                Value::Int(key) => Some(Key::Int(key)),
                Value::Str(key) => Some(Key::Str(key)),
                Value::Null => None,
                other => Some(Key::Str(other.to_string().into())),
            };
        } else {
            self.props.insert(key, value);
        }
        self
    }

    pub fn props<K, V>(mut self, props: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in props {
            self = self.prop(key, value);
        }
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn text(mut self, content: impl Into<Rc<str>>) -> Self {
        self.children = Children::Text(content.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children = Children::List(children.into_iter().map(Into::into).collect());
        self
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        match &mut self.children {
            Children::List(list) => list.push(child.into()),
            _ => self.children = Children::List(vec![child.into()]),
        }
        self
    }

    /// Add a named slot. Only meaningful on component nodes.
    pub fn slot(mut self, name: impl Into<String>, slot: impl Fn(&Object) -> Vec<VNode> + 'static) -> Self {
        match &mut self.children {
            Children::Slots(slots) => slots.insert(name, slot),
            _ => {
                let mut slots = Slots::new();
                slots.insert(name, slot);
                self.children = Children::Slots(slots);
            }
        }
        self
    }

    pub fn build(self) -> VNode {
        let children = match (&self.ty, self.children) {
            // Fragments have no host element to hold text; wrap it.
            (VNodeType::Fragment, Children::Text(content)) => Children::List(vec![text(&content)]),
            (_, children) => children,
        };

        VNode(Rc::new(VNodeInner {
            ty: self.ty,
            props: Rc::new(self.props),
            children,
            key: self.key,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        }))
    }
}

impl From<VNodeBuilder> for VNode {
    fn from(builder: VNodeBuilder) -> Self {
        builder.build()
    }
}

/// Start building a node of type `ty`: an element tag or a component.
pub fn h(ty: impl Into<VNodeType>) -> VNodeBuilder {
    VNodeBuilder {
        ty: ty.into(),
        props: Props::new(),
        children: Children::None,
        key: None,
    }
}

/// A text node.
pub fn text(content: &str) -> VNode {
    VNodeBuilder {
        ty: VNodeType::Text,
        props: Props::new(),
        children: Children::Text(content.into()),
        key: None,
    }
    .build()
}

/// A fragment of `children`.
pub fn fragment<I>(children: I) -> VNode
where
    I: IntoIterator,
    I::Item: Into<VNode>,
{
    VNodeBuilder {
        ty: VNodeType::Fragment,
        props: Props::new(),
        children: Children::None,
        key: None,
    }
    .children(children)
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_routes_key_prop() {
        let node = h("li").prop("key", 3).prop("class", "item").text("x").build();

        assert_eq!(node.key(), Some(&Key::Int(3)));
        assert!(node.prop("key").is_none());
        assert_eq!(node.prop("class"), Some(&Value::from("item")));
        assert_eq!(node.text_content(), Some("x"));
    }

    #[test]
    fn same_vnode_compares_type_and_key() {
        let a = h("li").key("a").build();
        let a2 = h("li").key("a").text("changed").build();
        let b = h("li").key("b").build();
        let span = h("span").key("a").build();

        assert!(same_vnode(&a, &a2));
        assert!(!same_vnode(&a, &b));
        assert!(!same_vnode(&a, &span));
        assert!(same_vnode(&h("p").build(), &h("p").build()));
    }

    #[test]
    fn fragment_text_is_wrapped() {
        let node = h(VNodeType::Fragment).text("hi").build();
        assert_eq!(node.child_list().len(), 1);
        assert_eq!(*node.child_list()[0].ty(), VNodeType::Text);
    }

    #[test]
    fn child_appends() {
        let node = h("div").child(text("a")).child(h("span")).build();
        assert_eq!(node.child_list().len(), 2);
    }

    #[test]
    fn component_types_compare_by_identity() {
        let a = Rc::new(Component::new("A"));
        let b = Rc::new(Component::new("A"));

        assert_eq!(VNodeType::from(&a), VNodeType::from(a.clone()));
        assert_ne!(VNodeType::from(&a), VNodeType::from(&b));
    }
}
