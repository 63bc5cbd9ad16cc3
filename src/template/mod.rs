//! Templates: compiled, parsed and ready to clone
//!
//! A [`Template`] is built once per fragment sequence and kind, and kept in a
//! [`TemplateCache`]. Each render of a new template into a child part clones
//! the template content into a `TemplateInstance` with one part per
//! [`TemplatePart`] descriptor.

mod build;
mod cache;
mod instance;

pub use build::{AttributeFlavor, Template, TemplatePart};
pub use cache::TemplateCache;
pub(crate) use instance::TemplateInstance;
