//! weft - declarative templates compiled once and re-rendered incrementally
//!
//! A template is a sequence of literal fragments with dynamic slots between
//! them. The fragments are compiled once per call site into a parsed content
//! tree with a list of binding descriptors; every render clones that tree
//! the first time and afterwards only touches the bindings whose values
//! changed.
//!
//! # Example
//!
//! ```rust
//! use weft::{html, EngineConfig, MemoryHost, Renderer};
//!
//! fn card(title: &str, done: bool) -> weft::TemplateResult {
//!     html!("<div class=\"card\" ?hidden=", "><h2>", "</h2></div>"; done, title)
//! }
//!
//! let mut host = MemoryHost::new();
//! let body = host.create_element("body");
//! let mut renderer = Renderer::new(host, &EngineConfig::default());
//!
//! renderer.render(card("Write docs", false), body).unwrap();
//! assert_eq!(
//!     renderer.host().rendered_html(body),
//!     "<div class=\"card\"><h2>Write docs</h2></div>"
//! );
//!
//! renderer.render(card("Write docs", true), body).unwrap();
//! assert_eq!(
//!     renderer.host().rendered_html(body),
//!     "<div class=\"card\" hidden><h2>Write docs</h2></div>"
//! );
//! ```

pub mod compiler;
pub mod config;
pub mod directive;
pub mod directives;
pub mod error;
pub mod helpers;
pub mod host;
pub mod part;
pub mod reconcile;
pub mod render;
mod runtime;
pub mod strings;
pub mod template;
pub mod value;

pub use compiler::{compile, CompiledMarkup, Markers};
pub use config::{ConfigError, EngineConfig, RenderOptions};
pub use directive::{DirectiveKind, DirectiveResult};
pub use directives::{
    async_replace, async_replace_with, class_map, element_ref, guard, keyed, live, repeat,
    repeat_unkeyed, unsafe_html, unsafe_svg, ElementRef, Producer,
};
pub use error::TemplateError;
pub use helpers::{if_defined, join, join_with, map, range, when};
pub use host::{Host, ListenerOptions, MemoryHost, NodeId, NodeKind};
pub use part::{PartInfo, PartType, SanitizeKind, SanitizerFactory, ValueSanitizer};
pub use render::{render_to_string, Renderer, RootPart};
pub use strings::{StaticStrings, StringsId, TemplateStrings};
pub use template::{AttributeFlavor, Template, TemplateCache, TemplatePart};
pub use value::{Event, ItemKey, Listener, ResultKind, TemplateResult, Value};
