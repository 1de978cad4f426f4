//! Components
//!
//! A [`Component`] is a definition: a name, an optional `setup` function,
//! and an optional render function. Mounting a component node creates a
//! [`ComponentInstance`] that owns the component's state for as long as the
//! node stays mounted.
//!
//! # How Components Work
//!
//! 1. Setup runs once, untracked, with the instance pushed as the current
//!    instance. It receives the props as a shallow readonly view and a
//!    [`SetupContext`] for emitting events.
//!
//! 2. Setup returns either a state record, whose refs are unwrapped for
//!    render code, or a render function that replaces the definition's.
//!
//! 3. The renderer wraps the render function in an effect. Everything the
//!    render function reads becomes a dependency, and a change queues a
//!    re-render on the job queue.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::host::HostHandle;
use super::inject::Provides;
use super::slots::{render_slot, Slots};
use super::vnode::{Children, VNode, VNodeType};
use crate::error::{RenderError, Result};
use crate::reactive::{proxy_refs, shallow_readonly, untracked, ProxyRefs, Reactive, ReactiveEffect, SubscriberId};
use crate::value::{Object, Value};
use crate::warn::warn;

/// Builds a component's subtree from its render context.
pub type RenderFn = Rc<dyn Fn(&RenderContext) -> VNode>;

/// Runs once per instance, before the first render.
pub type SetupFn = Rc<dyn Fn(&Reactive, &SetupContext) -> SetupResult>;

/// What `setup` hands back to the instance.
#[derive(Clone, Default)]
pub enum SetupResult {
    /// State exposed to render code, with refs unwrapped.
    State(Object),
    /// A render function that takes precedence over the definition's.
    Render(RenderFn),
    #[default]
    None,
}

impl SetupResult {
    pub fn render(render: impl Fn(&RenderContext) -> VNode + 'static) -> Self {
        SetupResult::Render(Rc::new(render))
    }
}

impl From<Object> for SetupResult {
    fn from(state: Object) -> Self {
        SetupResult::State(state)
    }
}

/// A component definition.
pub struct Component {
    name: Rc<str>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
}

impl Component {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            setup: None,
            render: None,
        }
    }

    pub fn setup<F, R>(mut self, setup: F) -> Self
    where
        F: Fn(&Reactive, &SetupContext) -> R + 'static,
        R: Into<SetupResult>,
    {
        self.setup = Some(Rc::new(move |props: &Reactive, ctx: &SetupContext| {
            setup(props, ctx).into()
        }));
        self
    }

    pub fn render(mut self, render: impl Fn(&RenderContext) -> VNode + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("has_setup", &self.setup.is_some())
            .field("has_render", &self.render.is_some())
            .finish()
    }
}

/// The mounted state of one component node.
pub struct ComponentInstance {
    uid: SubscriberId,
    component: Rc<Component>,
    vnode: RefCell<VNode>,
    next: RefCell<Option<VNode>>,
    props: Object,
    setup_state: RefCell<ProxyRefs>,
    render: RefCell<Option<RenderFn>>,
    slots: RefCell<Slots>,
    parent: Option<Weak<ComponentInstance>>,
    pub(crate) inherited: Provides,
    pub(crate) provides: RefCell<Provides>,
    is_mounted: Cell<bool>,
    subtree: RefCell<Option<VNode>>,
    update: RefCell<Option<ReactiveEffect<Result<()>>>>,
}

impl ComponentInstance {
    /// Create the instance for a component node. `inherited` is the
    /// injection chain visible to the new instance.
    pub(crate) fn new(
        vnode: &VNode,
        parent: Option<&Rc<ComponentInstance>>,
        inherited: Provides,
    ) -> Result<Rc<Self>> {
        let component = match vnode.ty() {
            VNodeType::Component(component) => Rc::clone(component),
            other => {
                return Err(RenderError::Invariant(format!(
                    "cannot create a component instance for a {} node",
                    other.kind()
                )))
            }
        };

        let inherited = match parent {
            Some(parent) => parent.provides.borrow().clone(),
            None => inherited,
        };

        Ok(Rc::new(Self {
            uid: SubscriberId::new(),
            component,
            vnode: RefCell::new(vnode.clone()),
            next: RefCell::new(None),
            props: vnode.props_object(),
            setup_state: RefCell::new(proxy_refs(&Object::new())),
            render: RefCell::new(None),
            slots: RefCell::new(Slots::from_children(vnode.children())),
            parent: parent.map(Rc::downgrade),
            provides: RefCell::new(inherited.clone()),
            inherited,
            is_mounted: Cell::new(false),
            subtree: RefCell::new(None),
            update: RefCell::new(None),
        }))
    }

    /// Identity used to deduplicate this instance's re-render job.
    pub fn uid(&self) -> SubscriberId {
        self.uid
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn component(&self) -> &Rc<Component> {
        &self.component
    }

    /// The node this instance is currently rendered for.
    pub fn vnode(&self) -> VNode {
        self.vnode.borrow().clone()
    }

    /// Props as seen by setup and render code.
    pub fn props(&self) -> Reactive {
        shallow_readonly(&self.props)
    }

    pub fn setup_state(&self) -> ProxyRefs {
        self.setup_state.borrow().clone()
    }

    pub fn slots(&self) -> Slots {
        self.slots.borrow().clone()
    }

    pub fn parent(&self) -> Option<Rc<ComponentInstance>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    /// The last rendered subtree.
    pub fn subtree(&self) -> Option<VNode> {
        self.subtree.borrow().clone()
    }

    /// The render effect, once created.
    pub fn update_effect(&self) -> Option<ReactiveEffect<Result<()>>> {
        self.update.borrow().clone()
    }

    /// Invoke the `on<Event>` prop handler for `event`, if one was passed.
    ///
    /// `item-click` looks up `onItemClick`.
    pub fn emit(&self, event: &str, args: &[Value]) {
        let handler = to_handler_key(&camelize(event));
        if let Some(Value::Callback(callback)) = self.props.get(&handler) {
            callback.call(args);
        }
    }

    /// Run setup and resolve the render function.
    pub(crate) fn setup(self: &Rc<Self>) -> Result<()> {
        if let Some(setup) = self.component.setup.clone() {
            let props = self.props();
            let ctx = SetupContext {
                instance: Rc::downgrade(self),
            };

            let result = {
                let _current = CurrentInstance::enter(Rc::clone(self));
                untracked(|| setup(&props, &ctx))
            };

            match result {
                SetupResult::State(state) => *self.setup_state.borrow_mut() = proxy_refs(&state),
                SetupResult::Render(render) => *self.render.borrow_mut() = Some(render),
                SetupResult::None => {}
            }
        }

        let mut render = self.render.borrow_mut();
        if render.is_none() {
            *render = self.component.render.clone();
        }

        match *render {
            Some(_) => Ok(()),
            None => Err(RenderError::MissingRender {
                component: self.name().to_owned(),
            }),
        }
    }

    /// Call the render function.
    pub(crate) fn render_subtree(self: &Rc<Self>) -> Result<VNode> {
        let render = self.render.borrow().clone().ok_or_else(|| RenderError::MissingRender {
            component: self.name().to_owned(),
        })?;

        let ctx = RenderContext {
            instance: Rc::clone(self),
        };
        Ok(render(&ctx))
    }

    pub(crate) fn set_update(&self, effect: ReactiveEffect<Result<()>>) {
        *self.update.borrow_mut() = Some(effect);
    }

    /// Run the render effect if the instance is still live.
    pub(crate) fn run_update(&self) -> Result<()> {
        let effect = self.update.borrow().clone();
        match effect {
            Some(effect) if effect.is_active() => effect.run(),
            _ => Ok(()),
        }
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.is_mounted.set(mounted);
    }

    pub(crate) fn replace_subtree(&self, subtree: VNode) -> Option<VNode> {
        self.subtree.borrow_mut().replace(subtree)
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.vnode.borrow_mut() = vnode;
    }

    pub(crate) fn set_next(&self, next: VNode) {
        *self.next.borrow_mut() = Some(next);
    }

    /// Adopt a node queued by a parent update: new vnode, props, and slots.
    pub(crate) fn apply_next(&self) {
        let Some(next) = self.next.borrow_mut().take() else {
            return;
        };

        next.set_el(self.vnode().el());

        for key in self.props.keys() {
            if !next.props().contains_key(&key) {
                self.props.remove(&key);
            }
        }
        for (key, value) in next.props().iter() {
            self.props.set(key.as_str(), value.clone());
        }

        *self.slots.borrow_mut() = Slots::from_children(next.children());
        self.set_vnode(next);
    }

    /// Stop the render effect. The instance will not render again.
    pub(crate) fn stop(&self) {
        if let Some(effect) = self.update.borrow().as_ref() {
            effect.stop();
        }
        self.is_mounted.set(false);
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid.raw())
            .field("name", &self.name())
            .field("is_mounted", &self.is_mounted())
            .finish()
    }
}

/// Passed to `setup`.
#[derive(Clone)]
pub struct SetupContext {
    instance: Weak<ComponentInstance>,
}

impl SetupContext {
    /// Emit `event` to the parent's `on<Event>` handler.
    pub fn emit(&self, event: &str, args: &[Value]) {
        if let Some(instance) = self.instance.upgrade() {
            instance.emit(event, args);
        }
    }

    pub fn instance(&self) -> Option<Rc<ComponentInstance>> {
        self.instance.upgrade()
    }
}

/// What render code sees.
///
/// [`RenderContext::get`] resolves names in order: setup state (refs
/// unwrapped), then props, then the `$props` and `$el` accessors.
#[derive(Clone)]
pub struct RenderContext {
    instance: Rc<ComponentInstance>,
}

impl RenderContext {
    pub fn get(&self, key: &str) -> Value {
        let state = self.instance.setup_state();
        if state.contains_key(key) {
            return state.get(key);
        }

        let props = self.instance.props();
        if props.has(key) {
            return props.get(key);
        }

        match key {
            "$props" => Value::Reactive(props),
            "$el" => self
                .el()
                .map(|el| Value::Int(el.raw() as i64))
                .unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Write setup state. Props cannot be written from render code.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let state = self.instance.setup_state();
        if state.contains_key(key) {
            state.set(key, value);
        } else if self.instance.props().has(key) {
            warn(format!("attempting to mutate prop \"{key}\": props are readonly"));
        } else {
            state.set(key, value);
        }
    }

    pub fn props(&self) -> Reactive {
        self.instance.props()
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    /// Render slot `name` with `props` into a Fragment.
    pub fn render_slot(&self, name: &str, props: &Object) -> VNode {
        render_slot(&self.instance.slots(), name, props)
    }

    /// Host handle of the component's root node, once mounted.
    pub fn el(&self) -> Option<HostHandle> {
        self.instance.vnode().el()
    }

    pub fn emit(&self, event: &str, args: &[Value]) {
        self.instance.emit(event, args);
    }

    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }
}

thread_local! {
    static CURRENT_INSTANCE: RefCell<Vec<Rc<ComponentInstance>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that keeps an instance current while setup runs.
struct CurrentInstance;

impl CurrentInstance {
    fn enter(instance: Rc<ComponentInstance>) -> Self {
        CURRENT_INSTANCE.with(|stack| stack.borrow_mut().push(instance));
        CurrentInstance
    }
}

impl Drop for CurrentInstance {
    fn drop(&mut self) {
        let _ = CURRENT_INSTANCE.try_with(|stack| stack.borrow_mut().pop());
    }
}

/// The instance whose setup is running, if any.
pub fn current_instance() -> Option<Rc<ComponentInstance>> {
    CURRENT_INSTANCE.with(|stack| stack.borrow().last().cloned())
}

/// Whether a parent-driven update must re-render the child.
///
/// True when the slot payload is present on either side, when a prop was
/// added or removed, or when any prop value changed.
pub fn should_update_component(prev: &VNode, next: &VNode) -> bool {
    let has_slots = |node: &VNode| !matches!(node.children(), Children::None);
    if has_slots(prev) || has_slots(next) {
        return true;
    }

    let (prev, next) = (prev.props(), next.props());
    if Rc::ptr_eq(prev, next) {
        return false;
    }
    if prev.len() != next.len() {
        return true;
    }

    next.iter().any(|(key, value)| {
        prev.get(key)
            .map_or(true, |previous| !previous.same_value(value))
    })
}

/// `item-click` → `itemClick`.
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;

    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `click` → `onClick`.
pub fn to_handler_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vnode::h;
    use crate::value::Callback;

    #[test]
    fn event_name_conversion() {
        assert_eq!(camelize("item-click"), "itemClick");
        assert_eq!(camelize("add"), "add");
        assert_eq!(to_handler_key("add"), "onAdd");
        assert_eq!(to_handler_key(&camelize("add-foo")), "onAddFoo");
        assert_eq!(to_handler_key(""), "");
    }

    #[test]
    fn emit_calls_matching_prop_handler() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let on_add = Callback::new(move |args| sink.borrow_mut().extend(args.iter().cloned()));

        let component = Rc::new(Component::new("Foo").render(|_| h("div").build()));
        let vnode = h(&component).prop("onAddFoo", on_add).build();
        let instance = ComponentInstance::new(&vnode, None, Provides::root()).unwrap();

        instance.emit("add-foo", &[Value::from(1), Value::from(2)]);
        instance.emit("unknown", &[Value::from(3)]);

        assert_eq!(*received.borrow(), vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn setup_state_and_missing_render() {
        let component = Rc::new(Component::new("NoRender"));
        let vnode = h(&component).build();
        let instance = ComponentInstance::new(&vnode, None, Provides::root()).unwrap();

        assert_eq!(
            instance.setup(),
            Err(RenderError::MissingRender {
                component: "NoRender".into()
            })
        );
    }

    #[test]
    fn current_instance_is_set_during_setup() {
        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();

        let component = Rc::new(
            Component::new("Current")
                .setup(move |_, _| {
                    flag.set(current_instance().is_some_and(|i| i.name() == "Current"));
                    SetupResult::None
                })
                .render(|_| h("div").build()),
        );
        let instance = ComponentInstance::new(&h(&component).build(), None, Provides::root()).unwrap();

        assert!(current_instance().is_none());
        instance.setup().unwrap();
        assert!(seen.get());
        assert!(current_instance().is_none());
    }

    #[test]
    fn should_update_on_prop_change() {
        let a = h("x").prop("msg", "hi").build();
        let same = h("x").prop("msg", "hi").build();
        let changed = h("x").prop("msg", "bye").build();
        let removed = h("x").build();

        assert!(!should_update_component(&a, &same));
        assert!(should_update_component(&a, &changed));
        assert!(should_update_component(&a, &removed));
    }

    #[test]
    fn should_update_with_slots() {
        let a = h("x").child(h("p")).build();
        let b = h("x").child(h("p")).build();
        assert!(should_update_component(&a, &b));
    }

    #[test]
    fn render_context_resolution_order() {
        let component = Rc::new(
            Component::new("Ctx")
                .setup(|_, _| Object::new().with("msg", crate::reactive::Ref::new("state")))
                .render(|_| h("div").build()),
        );
        let vnode = h(&component).prop("msg", "prop").prop("title", "t").build();
        let instance = ComponentInstance::new(&vnode, None, Provides::root()).unwrap();
        instance.setup().unwrap();

        let ctx = RenderContext {
            instance: instance.clone(),
        };
        assert_eq!(ctx.get("msg"), Value::from("state"));
        assert_eq!(ctx.get("title"), Value::from("t"));
        assert!(matches!(ctx.get("$props"), Value::Reactive(_)));
        assert_eq!(ctx.get("missing"), Value::Null);

        ctx.set("msg", "updated");
        assert_eq!(ctx.get("msg"), Value::from("updated"));
    }
}
