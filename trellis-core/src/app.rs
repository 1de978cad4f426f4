//! Application
//!
//! An [`App`] mounts one root component into a host container and owns the
//! renderer for it.
//!
//! ```rust,ignore
//! let mut app = create_app(root)
//!     .with_config(AppConfig::new().warn_handler(|msg| eprintln!("{msg}")));
//! app.provide("theme", "dark");
//! let instance = app.mount(host, container)?;
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{RenderError, Result};
use crate::render::{h, Component, ComponentInstance, ErrorHandler, Host, HostHandle, Props, Provides, Renderer, VNode};
use crate::value::Value;
use crate::warn::{self, warn};

/// Receives every non-fatal warning.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Application-level configuration.
#[derive(Clone, Default)]
pub struct AppConfig {
    warn_handler: Option<WarnHandler>,
    error_handler: Option<ErrorHandler>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe warnings, in addition to the `tracing` log.
    pub fn warn_handler(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.warn_handler = Some(Rc::new(handler));
        self
    }

    /// Handle errors from scheduled re-renders. Without one they are logged.
    pub fn error_handler(mut self, handler: impl Fn(&RenderError) + 'static) -> Self {
        self.error_handler = Some(Rc::new(handler));
        self
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("warn_handler", &self.warn_handler.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

struct Mounted {
    renderer: Rc<Renderer>,
    container: HostHandle,
    vnode: VNode,
    /// The handler displaced by ours, put back on unmount.
    prev_warn_handler: Option<Option<WarnHandler>>,
}

/// A root component plus everything needed to mount it.
pub struct App {
    root: Rc<Component>,
    root_props: Props,
    config: AppConfig,
    provides: Provides,
    mounted: Option<Mounted>,
}

/// Create an application for `root`.
pub fn create_app(root: Rc<Component>) -> App {
    App {
        root,
        root_props: Props::new(),
        config: AppConfig::default(),
        provides: Provides::root(),
        mounted: None,
    }
}

impl App {
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Props passed to the root component.
    pub fn with_props<K, V>(mut self, props: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in props {
            self.root_props.insert(key.into(), value.into());
        }
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Make `value` injectable under `key` by every component of the app.
    pub fn provide(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.provides.insert(key, value.into());
        self
    }

    /// Mount the root component into `container`.
    pub fn mount(&mut self, host: Rc<dyn Host>, container: HostHandle) -> Result<Rc<ComponentInstance>> {
        if let Some(instance) = self.root_instance() {
            warn("app has already been mounted; unmount it first");
            return Ok(instance);
        }

        let prev_warn_handler = self
            .config
            .warn_handler
            .as_ref()
            .map(|handler| warn::replace_handler(Some(Rc::clone(handler))));

        let renderer = Renderer::new(host);
        renderer.set_error_handler(self.config.error_handler.clone());
        renderer.set_root_provides(self.provides.clone());

        let vnode = h(&self.root).props(self.root_props.clone()).build();
        let instance = renderer.render(Some(&vnode), container).and_then(|()| {
            vnode.component().ok_or_else(|| {
                RenderError::Invariant("root component has no instance after mount".to_owned())
            })
        });
        let instance = match instance {
            Ok(instance) => instance,
            Err(err) => {
                if let Some(prev) = prev_warn_handler {
                    warn::replace_handler(prev);
                }
                return Err(err);
            }
        };

        tracing::debug!(component = self.root.name(), container = container.raw(), "app mounted");

        self.mounted = Some(Mounted {
            renderer,
            container,
            vnode,
            prev_warn_handler,
        });
        Ok(instance)
    }

    /// Unmount the root component and restore the warn handler that was
    /// active before mount. No-op if not mounted.
    pub fn unmount(&mut self) -> Result<()> {
        if let Some(mounted) = self.mounted.take() {
            let result = mounted.renderer.render(None, mounted.container);
            if let Some(prev) = mounted.prev_warn_handler {
                warn::replace_handler(prev);
            }
            result?;
            tracing::debug!(component = self.root.name(), "app unmounted");
        }
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// The mounted root instance.
    pub fn root_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.mounted.as_ref().and_then(|mounted| mounted.vnode.component())
    }

    pub fn renderer(&self) -> Option<&Rc<Renderer>> {
        self.mounted.as_ref().map(|mounted| &mounted.renderer)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("config", &self.config)
            .field("is_mounted", &self.is_mounted())
            .finish()
    }
}
