//! The rendering entry point
//!
//! A [`Renderer`] owns a host document and all live template state for it.
//! Rendering a value into a container the first time creates a root child
//! part there; every later render into the same container updates that part
//! in place.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::compiler::Markers;
use crate::config::{EngineConfig, RenderOptions};
use crate::error::TemplateError;
use crate::host::{Host, MemoryHost, NodeId};
use crate::part::{pass_through_factory, SanitizerFactory};
use crate::runtime::{Key, Runtime};
use crate::template::Template;
use crate::value::{Event, TemplateResult, Value};

/// Handle to the root part of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootPart {
    key: Key,
    container: NodeId,
}

impl RootPart {
    /// Node the root part renders into
    pub fn container(&self) -> NodeId {
        self.container
    }
}

/// Renders values into a host document, incrementally
pub struct Renderer<H: Host = MemoryHost> {
    host: H,
    runtime: Runtime,
    /// Root part per owner node (`render_before` or the container)
    roots: HashMap<NodeId, Key>,
    defaults: RenderOptions,
}

impl<H: Host> Renderer<H> {
    pub fn new(host: H, config: &EngineConfig) -> Self {
        let markers = match config.marker_seed {
            Some(seed) => Markers::from_seed(seed),
            None => Markers::random(),
        };
        let mut runtime = Runtime::new(markers, config.dev_mode);
        if config.sanitize {
            runtime.sanitizer = Some(pass_through_factory());
        }
        Self {
            host,
            runtime,
            roots: HashMap::new(),
            defaults: config.render,
        }
    }

    /// Render `value` into `container` with the configured default options
    pub fn render(&mut self, value: impl Into<Value>, container: NodeId) -> Result<RootPart, TemplateError> {
        let options = self.defaults;
        self.render_with_options(value, container, options)
    }

    /// Render `value` into `container`.
    ///
    /// The root part is keyed by `options.render_before` when set, else by
    /// the container; options only apply when the root part is created.
    #[instrument(skip_all, fields(container = container.0))]
    pub fn render_with_options(
        &mut self,
        value: impl Into<Value>,
        container: NodeId,
        options: RenderOptions,
    ) -> Result<RootPart, TemplateError> {
        let owner = options.render_before.unwrap_or(container);
        let existing = self
            .roots
            .get(&owner)
            .copied()
            .filter(|&key| self.runtime.child(key).is_ok());

        let key = match existing {
            Some(key) => key,
            None => {
                let start = self.host.create_comment("");
                self.host.insert_before(container, start, options.render_before);
                let key = self
                    .runtime
                    .new_child_part(start, options.render_before, None, options.is_connected);
                self.roots.insert(owner, key);
                debug!(root = %key, connected = options.is_connected, "created root part");
                key
            }
        };

        self.runtime.set_child_value(&mut self.host, key, value.into(), key)?;
        Ok(RootPart { key, container })
    }

    /// Connect or disconnect everything rendered under `root`.
    ///
    /// Lifecycle-aware directives below it see the change; plain parts are
    /// not visited.
    pub fn set_connected(&mut self, root: RootPart, connected: bool) -> Result<(), TemplateError> {
        self.runtime.set_root_connected(root.key, connected)
    }

    pub fn is_connected(&self, root: RootPart) -> bool {
        self.runtime.is_connected(root.key)
    }

    /// Deliver pending producer values to connected `async_replace`
    /// bindings. Returns the number of commits.
    #[instrument(skip_all)]
    pub fn flush(&mut self) -> Result<usize, TemplateError> {
        let commits = self.runtime.flush(&mut self.host)?;
        if commits > 0 {
            debug!(commits, "flushed async values");
        }
        Ok(commits)
    }

    /// Invoke the listeners bound for `event.name` on `event.target`.
    ///
    /// Registrations made with `once` are removed before their handler
    /// runs. Returns the number of handlers invoked.
    pub fn dispatch_event(&mut self, event: &Event) -> usize {
        let mut invoked = 0;
        for (handle, options) in self.host.listeners(event.target, &event.name) {
            let Some(listener) = self.runtime.committed_listener(Key::from_handle(handle)) else {
                continue;
            };
            if options.once {
                self.host
                    .remove_event_listener(event.target, &event.name, handle, options);
            }
            listener.call(event);
            invoked += 1;
        }
        invoked
    }

    /// Route text, attribute and property writes through sanitizers built by
    /// `factory`. Parts that already wrote keep their sanitizer.
    pub fn set_sanitizer(&mut self, factory: SanitizerFactory) {
        self.runtime.sanitizer = Some(factory);
    }

    /// Compiled template for `result`, compiling it on first use
    pub fn template(&mut self, result: &TemplateResult) -> Result<Rc<Template>, TemplateError> {
        self.runtime.template_for(&mut self.host, result)
    }

    /// Number of compiled templates
    pub fn template_count(&self) -> usize {
        self.runtime.cache.len()
    }

    /// Number of live parts, instances and directive instances
    pub fn live_entries(&self) -> usize {
        self.runtime.live_entries()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

/// Render `value` once into a fresh [`MemoryHost`] and serialize it
pub fn render_to_string(value: impl Into<Value>, config: &EngineConfig) -> Result<String, TemplateError> {
    let mut host = MemoryHost::new();
    let container = host.create_element("body");
    let mut renderer = Renderer::new(host, config);
    renderer.render(value, container)?;
    Ok(renderer.host().rendered_html(container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;
    use pretty_assertions::assert_eq;

    fn renderer() -> (Renderer, NodeId) {
        let mut host = MemoryHost::new();
        let container = host.create_element("div");
        (Renderer::new(host, &EngineConfig::new().with_marker_seed(1)), container)
    }

    fn greeting(name: &str) -> TemplateResult {
        html!("<p>Hello ", "!</p>"; name)
    }

    #[test]
    fn test_render_and_update() {
        let (mut r, container) = renderer();
        r.render(greeting("a"), container).unwrap();
        assert_eq!(r.host().rendered_html(container), "<p>Hello a!</p>");

        r.render(greeting("b"), container).unwrap();
        assert_eq!(r.host().rendered_html(container), "<p>Hello b!</p>");
        assert_eq!(r.template_count(), 1);
    }

    #[test]
    fn test_same_root_for_same_container() {
        let (mut r, container) = renderer();
        let first = r.render("x", container).unwrap();
        let second = r.render("y", container).unwrap();
        assert_eq!(first, second);
        assert_eq!(r.host().rendered_html(container), "y");
    }

    #[test]
    fn test_render_before_keeps_existing_children() {
        let (mut r, container) = renderer();
        let tail = r.host_mut().create_element("hr");
        r.host_mut().append_child(container, tail);

        let options = RenderOptions::new().with_render_before(tail);
        r.render_with_options("before", container, options).unwrap();
        r.render_with_options("again", container, options).unwrap();
        assert_eq!(r.host().rendered_html(container), "again<hr>");
    }

    #[test]
    fn test_render_to_string() {
        let html = render_to_string(greeting("world"), &EngineConfig::default()).unwrap();
        assert_eq!(html, "<p>Hello world!</p>");
    }
}
