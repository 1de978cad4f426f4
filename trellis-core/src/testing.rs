//! In-Memory Host
//!
//! [`TestHost`] implements [`Host`] over a plain node arena and records
//! every call as a [`HostOp`]. Tests assert on the rendered markup with
//! [`TestHost::serialize`] and on the amount of work done with the op log.
//!
//! ```rust,ignore
//! let host = Rc::new(TestHost::new());
//! let root = host.create_root();
//! let renderer = Renderer::new(host.clone());
//! renderer.render(Some(&tree), root)?;
//! assert_eq!(host.inner_html(root), "<ul><li>a</li></ul>");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::render::{event_name, Host, HostHandle};
use crate::value::{Callback, Value};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateElement {
        el: HostHandle,
        tag: String,
    },
    CreateText {
        el: HostHandle,
        text: String,
    },
    PatchProp {
        el: HostHandle,
        key: String,
        prev: Option<String>,
        next: Option<String>,
    },
    /// `moved` is set when the child was attached before the call.
    Insert {
        child: HostHandle,
        parent: HostHandle,
        anchor: Option<HostHandle>,
        moved: bool,
    },
    Remove {
        child: HostHandle,
    },
    SetText {
        el: HostHandle,
        text: String,
    },
}

#[derive(Debug)]
enum NodeKind {
    Element { tag: String },
    Text,
}

#[derive(Debug)]
struct TestNode {
    kind: NodeKind,
    text: String,
    attrs: IndexMap<String, String>,
    listeners: IndexMap<String, Callback>,
    children: Vec<HostHandle>,
    parent: Option<HostHandle>,
}

impl TestNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_owned(),
            attrs: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    nodes: HashMap<HostHandle, TestNode>,
    ops: Vec<HostOp>,
}

impl HostState {
    fn alloc(&mut self, node: TestNode) -> HostHandle {
        self.next_id += 1;
        let handle = HostHandle::new(self.next_id);
        self.nodes.insert(handle, node);
        handle
    }

    fn detach(&mut self, child: HostHandle) -> bool {
        let parent = self.nodes.get_mut(&child).and_then(|node| node.parent.take());
        match parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            Some(parent) => {
                parent.children.retain(|&c| c != child);
                true
            }
            None => false,
        }
    }
}

/// An in-memory [`Host`] with an operation log.
#[derive(Debug, Default)]
pub struct TestHost {
    state: RefCell<HostState>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached `root` element to render into. Not logged.
    pub fn create_root(&self) -> HostHandle {
        self.state
            .borrow_mut()
            .alloc(TestNode::new(NodeKind::Element { tag: "root".to_owned() }, ""))
    }

    /// Markup for `handle` and its descendants.
    pub fn serialize(&self, handle: HostHandle) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        write_node(&state, handle, &mut out);
        out
    }

    /// Markup for the children of `handle`.
    pub fn inner_html(&self, handle: HostHandle) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        write_children(&state, handle, &mut out);
        out
    }

    pub fn children(&self, handle: HostHandle) -> Vec<HostHandle> {
        self.state
            .borrow()
            .nodes
            .get(&handle)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, handle: HostHandle) -> Option<HostHandle> {
        self.state.borrow().nodes.get(&handle).and_then(|node| node.parent)
    }

    pub fn tag(&self, handle: HostHandle) -> Option<String> {
        match &self.state.borrow().nodes.get(&handle)?.kind {
            NodeKind::Element { tag } => Some(tag.clone()),
            NodeKind::Text => None,
        }
    }

    /// Own text of a node: the content of a text node, or text set on an
    /// element.
    pub fn text(&self, handle: HostHandle) -> Option<String> {
        self.state.borrow().nodes.get(&handle).map(|node| node.text.clone())
    }

    pub fn attr(&self, handle: HostHandle, key: &str) -> Option<String> {
        self.state.borrow().nodes.get(&handle)?.attrs.get(key).cloned()
    }

    pub fn has_listener(&self, handle: HostHandle, event: &str) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&handle)
            .is_some_and(|node| node.listeners.contains_key(event))
    }

    /// Invoke the `event` listener on `handle`. Returns false if none is
    /// registered.
    ///
    /// Re-renders caused by the listener are queued; run
    /// [`run_microtasks`](crate::scheduler::run_microtasks) to apply them.
    pub fn dispatch(&self, handle: HostHandle, event: &str, args: &[Value]) -> bool {
        let listener = self
            .state
            .borrow()
            .nodes
            .get(&handle)
            .and_then(|node| node.listeners.get(event).cloned());

        match listener {
            Some(listener) => {
                listener.call(args);
                true
            }
            None => false,
        }
    }

    /// Every host call since creation or the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> Vec<HostOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// The op log as JSON.
    pub fn ops_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.state.borrow().ops)
    }

    /// Elements and text nodes created.
    pub fn created_count(&self) -> usize {
        self.count(|op| matches!(op, HostOp::CreateElement { .. } | HostOp::CreateText { .. }))
    }

    /// Inserts of nodes that were already attached.
    pub fn move_count(&self) -> usize {
        self.count(|op| matches!(op, HostOp::Insert { moved: true, .. }))
    }

    pub fn remove_count(&self) -> usize {
        self.count(|op| matches!(op, HostOp::Remove { .. }))
    }

    pub fn count(&self, predicate: impl Fn(&HostOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| predicate(op)).count()
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    fn record(&self, op: HostOp) {
        tracing::trace!(?op, "host op");
        self.state.borrow_mut().ops.push(op);
    }
}

impl Host for TestHost {
    fn create_element(&self, tag: &str) -> HostHandle {
        let el = self
            .state
            .borrow_mut()
            .alloc(TestNode::new(NodeKind::Element { tag: tag.to_owned() }, ""));
        self.record(HostOp::CreateElement {
            el,
            tag: tag.to_owned(),
        });
        el
    }

    fn create_text(&self, text: &str) -> HostHandle {
        let el = self.state.borrow_mut().alloc(TestNode::new(NodeKind::Text, text));
        self.record(HostOp::CreateText {
            el,
            text: text.to_owned(),
        });
        el
    }

    fn patch_prop(&self, el: HostHandle, key: &str, prev: Option<&Value>, next: Option<&Value>) {
        let next = next.filter(|value| !value.is_null());

        {
            let mut state = self.state.borrow_mut();
            if let Some(node) = state.nodes.get_mut(&el) {
                match event_name(key) {
                    Some(event) => match next.and_then(Value::as_callback) {
                        Some(callback) => {
                            node.listeners.insert(event, callback.clone());
                        }
                        None => {
                            node.listeners.shift_remove(&event);
                        }
                    },
                    _ => match next {
                        Some(value) => {
                            node.attrs.insert(key.to_owned(), value.to_string());
                        }
                        None => {
                            node.attrs.shift_remove(key);
                        }
                    },
                }
            }
        }

        self.record(HostOp::PatchProp {
            el,
            key: key.to_owned(),
            prev: prev.map(ToString::to_string),
            next: next.map(ToString::to_string),
        });
    }

    fn insert(&self, child: HostHandle, parent: HostHandle, anchor: Option<HostHandle>) {
        let moved = {
            let mut state = self.state.borrow_mut();
            let moved = state.detach(child);

            if let Some(node) = state.nodes.get_mut(&parent) {
                let position = anchor
                    .and_then(|anchor| node.children.iter().position(|&c| c == anchor))
                    .unwrap_or(node.children.len());
                node.children.insert(position, child);
            }
            if let Some(node) = state.nodes.get_mut(&child) {
                node.parent = Some(parent);
            }
            moved
        };

        self.record(HostOp::Insert {
            child,
            parent,
            anchor,
            moved,
        });
    }

    fn remove(&self, child: HostHandle) {
        let detached = self.state.borrow_mut().detach(child);
        if detached {
            self.record(HostOp::Remove { child });
        }
    }

    fn set_text(&self, el: HostHandle, text: &str) {
        {
            let mut state = self.state.borrow_mut();
            let children = state
                .nodes
                .get_mut(&el)
                .map(|node| {
                    node.text = text.to_owned();
                    std::mem::take(&mut node.children)
                })
                .unwrap_or_default();

            for child in children {
                if let Some(node) = state.nodes.get_mut(&child) {
                    node.parent = None;
                }
            }
        }

        self.record(HostOp::SetText {
            el,
            text: text.to_owned(),
        });
    }

    fn next_sibling(&self, node: HostHandle) -> Option<HostHandle> {
        let state = self.state.borrow();
        let parent = state.nodes.get(&node)?.parent?;
        let siblings = &state.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }
}

fn write_node(state: &HostState, handle: HostHandle, out: &mut String) {
    let Some(node) = state.nodes.get(&handle) else {
        return;
    };

    match &node.kind {
        NodeKind::Text => out.push_str(&node.text),
        NodeKind::Element { tag } => {
            let _ = write!(out, "<{tag}");
            for (key, value) in &node.attrs {
                let _ = write!(out, " {key}=\"{value}\"");
            }
            out.push('>');
            write_children(state, handle, out);
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn write_children(state: &HostState, handle: HostHandle, out: &mut String) {
    let Some(node) = state.nodes.get(&handle) else {
        return;
    };

    if node.children.is_empty() {
        out.push_str(&node.text);
    } else {
        for &child in &node.children {
            write_node(state, child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_and_serialize() {
        let host = TestHost::new();
        let root = host.create_root();

        let div = host.create_element("div");
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert(div, root, None);
        host.insert(b, div, None);
        host.insert(a, div, Some(b));

        assert_eq!(host.serialize(root), "<root><div>ab</div></root>");
        assert_eq!(host.next_sibling(a), Some(b));
        assert_eq!(host.next_sibling(b), None);

        host.remove(a);
        host.remove(a);
        assert_eq!(host.inner_html(root), "<div>b</div>");
        assert_eq!(host.remove_count(), 1);
        // Detached nodes stay addressable.
        assert_eq!(host.node_count(), 4);
        assert_eq!(host.parent(a), None);
    }

    #[test]
    fn reinsert_counts_as_move() {
        let host = TestHost::new();
        let root = host.create_root();
        let a = host.create_element("a");
        let b = host.create_element("b");

        host.insert(a, root, None);
        host.insert(b, root, None);
        host.insert(b, root, Some(a));

        assert_eq!(host.inner_html(root), "<b></b><a></a>");
        assert_eq!(host.move_count(), 1);
    }

    #[test]
    fn props_and_listeners() {
        let host = TestHost::new();
        let el = host.create_element("button");
        let clicks = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = clicks.clone();
        let on_click = Value::from(Callback::new(move |_| counter.set(counter.get() + 1)));

        host.patch_prop(el, "id", None, Some(&Value::from("ok")));
        host.patch_prop(el, "onClick", None, Some(&on_click));
        assert_eq!(host.attr(el, "id").as_deref(), Some("ok"));
        assert!(host.dispatch(el, "click", &[]));
        assert_eq!(clicks.get(), 1);

        host.patch_prop(el, "id", Some(&Value::from("ok")), Some(&Value::Null));
        host.patch_prop(el, "onClick", Some(&on_click), None);
        assert_eq!(host.attr(el, "id"), None);
        assert!(!host.dispatch(el, "click", &[]));
    }

    #[test]
    fn set_text_replaces_children() {
        let host = TestHost::new();
        let root = host.create_root();
        let child = host.create_element("span");
        host.insert(child, root, None);

        host.set_text(root, "hello");
        assert_eq!(host.inner_html(root), "hello");
        assert_eq!(host.parent(child), None);
    }

    #[test]
    fn ops_export_as_json() {
        let host = TestHost::new();
        let root = host.create_root();
        let el = host.create_element("p");
        host.insert(el, root, None);

        let json = host.ops_json().unwrap();
        let ops: Vec<HostOp> = serde_json::from_str(&json).unwrap();
        assert_eq!(ops, host.ops());
        assert!(json.contains("\"op\": \"create_element\""));
    }
}
