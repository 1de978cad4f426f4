//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (reactive objects, refs, computed values, effects)
//! - A virtual node model with components, fragments, and slots
//! - A patch engine with keyed-children reconciliation
//! - A batched job queue that coalesces re-renders per tick
//!
//! The renderer writes to any output tree through the [`render::Host`]
//! trait. [`testing::TestHost`] is an in-memory host for tests.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: Dynamic values and the raw objects reactivity observes
//! - `reactive`: Dependency tracking, effects, reactive views, refs, computed
//! - `scheduler`: Job queue and microtask queue
//! - `render`: Virtual nodes, components, provide/inject, and the renderer
//! - `app`: Application entry point and configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use trellis_core::app::create_app;
//! use trellis_core::reactive::Ref;
//! use trellis_core::render::{h, Component};
//! use trellis_core::scheduler::run_microtasks;
//! use trellis_core::testing::TestHost;
//! use trellis_core::value::{Callback, Object};
//!
//! let counter = Rc::new(
//!     Component::new("Counter")
//!         .setup(|_, _| Object::new().with("count", Ref::new(0)))
//!         .render(|ctx| {
//!             let count = ctx.get("count");
//!             h("button").text(count.to_string()).build()
//!         }),
//! );
//!
//! let host = Rc::new(TestHost::new());
//! let root = host.create_root();
//! let instance = create_app(counter).mount(host.clone(), root)?;
//!
//! instance.setup_state().set("count", 1);
//! run_microtasks();
//! // Re-rendered once, on the next microtask: <button>1</button>
//! ```

pub mod app;
pub mod error;
pub mod reactive;
pub mod render;
pub mod scheduler;
pub mod testing;
pub mod value;
pub mod warn;

pub use app::{create_app, App, AppConfig};
pub use error::RenderError;
pub use value::{Callback, Object, Value};
