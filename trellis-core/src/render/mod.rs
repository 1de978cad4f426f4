//! Rendering
//!
//! Virtual nodes, components, and the patch engine that reconciles them
//! against a [`Host`].
//!
//! # Data Flow
//!
//! ```text
//! state write ─▶ render effect scheduler ─▶ job queue
//!                                              │ (next microtask)
//!                                              ▼
//!            host mutations ◀─ patch(prev, next) ◀─ render()
//! ```

mod component;
mod host;
mod inject;
mod renderer;
mod sequence;
mod slots;
mod vnode;

pub use component::{
    camelize, current_instance, should_update_component, to_handler_key, Component,
    ComponentInstance, RenderContext, RenderFn, SetupContext, SetupFn, SetupResult,
};
pub use host::{event_name, is_event_key, Host, HostHandle};
pub use inject::{inject, inject_or, inject_with, provide, Provides};
pub use renderer::{ErrorHandler, Renderer};
pub use sequence::longest_increasing_subsequence;
pub use slots::{render_slot, SlotFn, Slots, DEFAULT_SLOT};
pub use vnode::{fragment, h, same_vnode, text, Children, Key, Props, VNode, VNodeBuilder, VNodeType};
