//! Patch Engine
//!
//! The [`Renderer`] turns virtual node trees into host mutations. Given the
//! previous tree and the next one, it emits the smallest set of host calls
//! that makes the host match the next tree.
//!
//! # How Patching Works
//!
//! [`Renderer::patch`] dispatches on the new node's type:
//!
//! - **Text**: create a text node, or update its content in place.
//! - **Fragment**: mount children between two empty text anchors, so the
//!   fragment can be patched, moved, and removed as one unit.
//! - **Element**: create and fill a host element, or patch children then
//!   props on the existing one.
//! - **Component**: create an instance, run setup, and bind rendering to a
//!   render effect. On update, re-render only when props or slots changed.
//!
//! If the old and new node are not the same node (type and key), the old
//! one is unmounted and the new one mounted in its place.
//!
//! # Keyed Children
//!
//! Two child lists are reconciled by trimming the common prefix and
//! suffix, then mounting or removing what is left on one side. When both
//! sides have a middle section, each old child is matched to a new index by
//! key (or by a linear scan for unkeyed children), and the longest
//! increasing subsequence of the matched old positions marks the children
//! that can stay put. Only the rest are moved.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use smallvec::{smallvec, SmallVec};

use super::component::{should_update_component, ComponentInstance};
use super::host::{Host, HostHandle};
use super::inject::Provides;
use super::sequence::longest_increasing_subsequence;
use super::vnode::{same_vnode, Children, Key, Props, VNode, VNodeType};
use crate::error::{RenderError, Result};
use crate::reactive::{EffectOptions, ReactiveEffect};
use crate::scheduler::{invalidate_job, queue_job};

/// Receives errors raised by re-renders that run from the job queue.
pub type ErrorHandler = Rc<dyn Fn(&RenderError)>;

/// Renders virtual nodes into a [`Host`].
pub struct Renderer {
    host: Rc<dyn Host>,
    roots: RefCell<HashMap<HostHandle, VNode>>,
    root_provides: RefCell<Provides>,
    error_handler: RefCell<Option<ErrorHandler>>,
    this: Weak<Renderer>,
}

impl Renderer {
    pub fn new(host: Rc<dyn Host>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            host,
            roots: RefCell::new(HashMap::new()),
            root_provides: RefCell::new(Provides::root()),
            error_handler: RefCell::new(None),
            this: this.clone(),
        })
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Install the handler for errors from scheduled re-renders.
    pub fn set_error_handler(&self, handler: Option<ErrorHandler>) {
        *self.error_handler.borrow_mut() = handler;
    }

    /// Injection chain seen by root components.
    pub fn set_root_provides(&self, provides: Provides) {
        *self.root_provides.borrow_mut() = provides;
    }

    /// Render `vnode` into `container`, patching against whatever was
    /// rendered there before. `None` unmounts it.
    pub fn render(&self, vnode: Option<&VNode>, container: HostHandle) -> Result<()> {
        let prev = self.roots.borrow().get(&container).cloned();

        match vnode {
            Some(vnode) => {
                self.patch(prev.as_ref(), vnode, container, None, None)?;
                self.roots.borrow_mut().insert(container, vnode.clone());
            }
            None => {
                if let Some(prev) = prev {
                    self.unmount(&prev, true);
                }
                self.roots.borrow_mut().remove(&container);
            }
        }
        Ok(())
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: HostHandle) -> Option<VNode> {
        self.roots.borrow().get(&container).cloned()
    }

    /// Patch `n1` into `n2` inside `container`, inserting new host nodes
    /// before `anchor`.
    pub fn patch(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        let mut n1 = n1;
        let mut anchor = anchor;

        if let Some(old) = n1 {
            if old.ptr_eq(n2) {
                return Ok(());
            }
            if !same_vnode(old, n2) {
                anchor = self.next_host_node(old);
                self.unmount(old, true);
                n1 = None;
            }
        }

        match n2.ty() {
            VNodeType::Text => self.process_text(n1, n2, container, anchor),
            VNodeType::Fragment => self.process_fragment(n1, n2, container, anchor, parent),
            VNodeType::Element(_) => self.process_element(n1, n2, container, anchor, parent),
            VNodeType::Component(_) => self.process_component(n1, n2, container, anchor, parent),
        }
    }

    fn process_text(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) -> Result<()> {
        let content = n2.text_content().unwrap_or_default();

        match n1 {
            None => {
                let el = self.host.create_text(content);
                n2.set_el(Some(el));
                self.host.insert(el, container, anchor);
            }
            Some(n1) => {
                let el = mounted(n1)?;
                n2.set_el(Some(el));
                if n1.text_content() != n2.text_content() {
                    self.host.set_text(el, content);
                }
            }
        }
        Ok(())
    }

    fn process_fragment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        match n1 {
            None => {
                let start = self.host.create_text("");
                let end = self.host.create_text("");
                n2.set_el(Some(start));
                n2.set_anchor(Some(end));

                self.host.insert(start, container, anchor);
                self.host.insert(end, container, anchor);
                self.mount_children(n2.child_list(), container, Some(end), parent)
            }
            Some(n1) => {
                let end = n1.anchor().ok_or(RenderError::Unmounted { kind: "fragment" })?;
                n2.set_el(n1.el());
                n2.set_anchor(Some(end));
                self.patch_children(n1, n2, container, Some(end), parent)
            }
        }
    }

    fn process_element(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        match n1 {
            None => self.mount_element(n2, container, anchor, parent),
            Some(n1) => self.patch_element(n1, n2, parent),
        }
    }

    fn mount_element(
        &self,
        vnode: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        let VNodeType::Element(tag) = vnode.ty() else {
            return Err(RenderError::Invariant(format!(
                "mount_element called with a {} node",
                vnode.ty().kind()
            )));
        };

        let el = self.host.create_element(tag);
        vnode.set_el(Some(el));

        match vnode.children() {
            Children::Text(content) => self.host.set_text(el, content),
            Children::List(children) => self.mount_children(children, el, None, parent)?,
            Children::None | Children::Slots(_) => {}
        }

        for (key, value) in vnode.props().iter() {
            self.host.patch_prop(el, key, None, Some(value));
        }

        self.host.insert(el, container, anchor);
        Ok(())
    }

    fn patch_element(&self, n1: &VNode, n2: &VNode, parent: Option<&Rc<ComponentInstance>>) -> Result<()> {
        let el = mounted(n1)?;
        n2.set_el(Some(el));

        self.patch_children(n1, n2, el, None, parent)?;
        self.patch_props(el, n1.props(), n2.props());
        Ok(())
    }

    fn patch_props(&self, el: HostHandle, old: &Rc<Props>, new: &Rc<Props>) {
        if Rc::ptr_eq(old, new) {
            return;
        }

        for (key, next) in new.iter() {
            let prev = old.get(key);
            if prev.map_or(true, |prev| !prev.same_value(next)) {
                self.host.patch_prop(el, key, prev, Some(next));
            }
        }

        for (key, prev) in old.iter() {
            if !new.contains_key(key) {
                self.host.patch_prop(el, key, Some(prev), None);
            }
        }
    }

    fn patch_children(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        match (n1.children(), n2.children()) {
            (Children::List(prev), Children::Text(next)) => {
                self.unmount_children(prev, true);
                self.host.set_text(container, next);
            }
            (Children::Text(prev), Children::Text(next)) => {
                if prev != next {
                    self.host.set_text(container, next);
                }
            }
            (_, Children::Text(next)) => self.host.set_text(container, next),
            (Children::Text(_), Children::List(next)) => {
                self.host.set_text(container, "");
                self.mount_children(next, container, anchor, parent)?;
            }
            (Children::List(prev), Children::List(next)) => {
                self.patch_keyed_children(prev, next, container, anchor, parent)?;
            }
            (_, Children::List(next)) => self.mount_children(next, container, anchor, parent)?,
            (Children::List(prev), _) => self.unmount_children(prev, true),
            (Children::Text(_), _) => self.host.set_text(container, ""),
            _ => {}
        }
        Ok(())
    }

    fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: HostHandle,
        parent_anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        let mut i = 0;
        // Exclusive ends.
        let mut e1 = c1.len();
        let mut e2 = c2.len();

        // 1. common prefix
        while i < e1 && i < e2 && same_vnode(&c1[i], &c2[i]) {
            self.patch(Some(&c1[i]), &c2[i], container, None, parent)?;
            i += 1;
        }

        // 2. common suffix
        while i < e1 && i < e2 && same_vnode(&c1[e1 - 1], &c2[e2 - 1]) {
            self.patch(Some(&c1[e1 - 1]), &c2[e2 - 1], container, None, parent)?;
            e1 -= 1;
            e2 -= 1;
        }

        // 3. only new nodes left
        if i >= e1 {
            if i < e2 {
                let anchor = c2.get(e2).and_then(VNode::el).or(parent_anchor);
                for child in &c2[i..e2] {
                    self.patch(None, child, container, anchor, parent)?;
                }
            }
            return Ok(());
        }

        // 4. only old nodes left
        if i >= e2 {
            for child in &c1[i..e1] {
                self.unmount(child, true);
            }
            return Ok(());
        }

        // 5. unknown middle section
        let (s1, s2) = (i, i);

        let key_to_new_index: HashMap<&Key, usize> = (s2..e2)
            .filter_map(|j| c2[j].key().map(|key| (key, j)))
            .collect();

        let to_be_patched = e2 - s2;
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index_so_far = 0;
        // Old position + 1 for each new slot; 0 means "mount fresh".
        let mut new_index_to_old: SmallVec<[usize; 16]> = smallvec![0; to_be_patched];

        for (old_index, prev) in c1.iter().enumerate().take(e1).skip(s1) {
            if patched >= to_be_patched {
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (s2..e2).find(|&j| new_index_to_old[j - s2] == 0 && same_vnode(prev, &c2[j])),
            };

            match new_index {
                None => self.unmount(prev, true),
                Some(new_index) => {
                    new_index_to_old[new_index - s2] = old_index + 1;
                    if new_index >= max_new_index_so_far {
                        max_new_index_so_far = new_index;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &c2[new_index], container, None, parent)?;
                    patched += 1;
                }
            }
        }

        let mut stable = if moved {
            longest_increasing_subsequence(&new_index_to_old)
        } else {
            Vec::new()
        };

        for offset in (0..to_be_patched).rev() {
            let new_index = s2 + offset;
            let child = &c2[new_index];
            let anchor = c2.get(new_index + 1).and_then(VNode::el).or(parent_anchor);

            if new_index_to_old[offset] == 0 {
                self.patch(None, child, container, anchor, parent)?;
            } else if moved {
                if stable.last() == Some(&offset) {
                    stable.pop();
                } else {
                    self.move_node(child, container, anchor);
                }
            }
        }

        Ok(())
    }

    fn mount_children(
        &self,
        children: &[VNode],
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        for child in children {
            self.patch(None, child, container, anchor, parent)?;
        }
        Ok(())
    }

    /// Re-insert every host node of `vnode` before `anchor`.
    fn move_node(&self, vnode: &VNode, container: HostHandle, anchor: Option<HostHandle>) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(subtree) = vnode.component().and_then(|instance| instance.subtree()) {
                    self.move_node(&subtree, container, anchor);
                }
            }
            VNodeType::Fragment => {
                if let Some(start) = vnode.el() {
                    self.host.insert(start, container, anchor);
                }
                for child in vnode.child_list() {
                    self.move_node(child, container, anchor);
                }
                if let Some(end) = vnode.anchor() {
                    self.host.insert(end, container, anchor);
                }
            }
            VNodeType::Element(_) | VNodeType::Text => {
                if let Some(el) = vnode.el() {
                    self.host.insert(el, container, anchor);
                }
            }
        }
    }

    /// The host node right after everything `vnode` rendered.
    fn next_host_node(&self, vnode: &VNode) -> Option<HostHandle> {
        match vnode.ty() {
            VNodeType::Component(_) => vnode
                .component()
                .and_then(|instance| instance.subtree())
                .and_then(|subtree| self.next_host_node(&subtree)),
            VNodeType::Fragment => vnode.anchor().and_then(|end| self.host.next_sibling(end)),
            VNodeType::Element(_) | VNodeType::Text => {
                vnode.el().and_then(|el| self.host.next_sibling(el))
            }
        }
    }

    fn unmount_children(&self, children: &[VNode], remove: bool) {
        for child in children {
            self.unmount(child, remove);
        }
    }

    /// Tear down `vnode`: stop component render effects in the subtree and,
    /// when `remove` is set, detach its host nodes.
    ///
    /// Descendants of a removed element are not detached one by one; they
    /// leave with their ancestor.
    fn unmount(&self, vnode: &VNode, remove: bool) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component() {
                    instance.stop();
                    invalidate_job(instance.uid());
                    if let Some(subtree) = instance.subtree() {
                        self.unmount(&subtree, remove);
                    }
                    instance.vnode().set_component(None);
                    vnode.set_component(None);
                    tracing::debug!(component = instance.name(), uid = instance.uid().raw(), "component unmounted");
                }
            }
            VNodeType::Fragment => {
                self.unmount_children(vnode.child_list(), remove);
                if remove {
                    if let Some(start) = vnode.el() {
                        self.host.remove(start);
                    }
                    if let Some(end) = vnode.anchor() {
                        self.host.remove(end);
                    }
                }
            }
            VNodeType::Element(_) => {
                self.unmount_children(vnode.child_list(), false);
                if remove {
                    if let Some(el) = vnode.el() {
                        self.host.remove(el);
                    }
                }
            }
            VNodeType::Text => {
                if remove {
                    if let Some(el) = vnode.el() {
                        self.host.remove(el);
                    }
                }
            }
        }
    }

    fn process_component(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        match n1 {
            None => self.mount_component(n2, container, anchor, parent),
            Some(n1) => self.update_component(n1, n2),
        }
    }

    fn mount_component(
        &self,
        vnode: &VNode,
        container: HostHandle,
        anchor: Option<HostHandle>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        let root_provides = self.root_provides.borrow().clone();
        let instance = ComponentInstance::new(vnode, parent, root_provides)?;
        vnode.set_component(Some(Rc::clone(&instance)));

        instance.setup()?;
        self.setup_render_effect(&instance, container, anchor)
    }

    fn update_component(&self, n1: &VNode, n2: &VNode) -> Result<()> {
        let instance = n1.component().ok_or(RenderError::Unmounted { kind: "component" })?;
        n2.set_component(Some(Rc::clone(&instance)));

        if should_update_component(n1, n2) {
            instance.set_next(n2.clone());
            // The forced run below covers anything already queued.
            invalidate_job(instance.uid());
            instance.run_update()
        } else {
            n2.set_el(n1.el());
            instance.set_vnode(n2.clone());
            Ok(())
        }
    }

    /// Bind the instance's rendering to a render effect and run it once.
    fn setup_render_effect(
        &self,
        instance: &Rc<ComponentInstance>,
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) -> Result<()> {
        let renderer = self.this.clone();
        let weak = Rc::downgrade(instance);

        let render = {
            let weak = weak.clone();
            move || -> Result<()> {
                match (renderer.upgrade(), weak.upgrade()) {
                    (Some(renderer), Some(instance)) => {
                        renderer.run_render_effect(&instance, container, anchor)
                    }
                    _ => Ok(()),
                }
            }
        };

        let uid = instance.uid();
        let error_target = self.this.clone();
        let scheduler = move || {
            let weak = weak.clone();
            let error_target = error_target.clone();
            queue_job(
                uid,
                Rc::new(move || {
                    let Some(instance) = weak.upgrade() else {
                        return;
                    };
                    if let Err(err) = instance.run_update() {
                        match error_target.upgrade() {
                            Some(renderer) => renderer.handle_error(&err),
                            None => tracing::error!(error = %err, "scheduled render failed"),
                        }
                    }
                }),
            );
        };

        let effect = ReactiveEffect::new(render, EffectOptions::new().scheduler(scheduler));
        instance.set_update(effect);
        instance.run_update()
    }

    fn run_render_effect(
        &self,
        instance: &Rc<ComponentInstance>,
        container: HostHandle,
        anchor: Option<HostHandle>,
    ) -> Result<()> {
        if !instance.is_mounted() {
            let subtree = instance.render_subtree()?;
            self.patch(None, &subtree, container, anchor, Some(instance))?;

            set_component_el(instance, subtree.el());
            instance.replace_subtree(subtree);
            instance.set_mounted(true);

            tracing::debug!(component = instance.name(), uid = instance.uid().raw(), "component mounted");
        } else {
            instance.apply_next();

            let next_tree = instance.render_subtree()?;
            let prev_tree = instance.replace_subtree(next_tree.clone());
            self.patch(prev_tree.as_ref(), &next_tree, container, None, Some(instance))?;

            set_component_el(instance, next_tree.el());

            tracing::debug!(component = instance.name(), uid = instance.uid().raw(), "component updated");
        }
        Ok(())
    }

    fn handle_error(&self, err: &RenderError) {
        let handler = self.error_handler.borrow().clone();
        match handler {
            Some(handler) => handler(err),
            None => tracing::error!(error = %err, "scheduled render failed"),
        }
    }
}

/// Point the instance's vnode at `el`, and every ancestor component whose
/// whole subtree is that vnode.
fn set_component_el(instance: &Rc<ComponentInstance>, el: Option<HostHandle>) {
    let mut vnode = instance.vnode();
    vnode.set_el(el);

    let mut ancestor = instance.parent();
    while let Some(parent) = ancestor {
        if !parent.subtree().is_some_and(|subtree| subtree.ptr_eq(&vnode)) {
            break;
        }
        vnode = parent.vnode();
        vnode.set_el(el);
        ancestor = parent.parent();
    }
}

fn mounted(vnode: &VNode) -> Result<HostHandle> {
    vnode.el().ok_or(RenderError::Unmounted {
        kind: vnode.ty().kind(),
    })
}
