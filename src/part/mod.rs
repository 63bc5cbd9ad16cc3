//! Parts: live bindings between a slot and a place in the host tree

mod attribute;
mod child;
mod element;
mod event;

use std::rc::Rc;

use crate::host::NodeId;
use crate::value::Value;

pub(crate) use attribute::AttributePart;
pub(crate) use child::ChildPart;
pub(crate) use element::ElementPart;
pub(crate) use event::EventPart;

/// The kind of binding a directive is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartType {
    Child,
    Attribute,
    Property,
    BooleanAttribute,
    Event,
    Element,
}

/// Binding site description handed to directive validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub ty: PartType,
    /// Attribute, property or event name
    pub name: Option<String>,
    /// Number of static strings of an interpolated attribute; `None` when
    /// the attribute value is a single expression
    pub strings: Option<usize>,
}

impl PartInfo {
    pub(crate) fn new(ty: PartType) -> Self {
        Self {
            ty,
            name: None,
            strings: None,
        }
    }

    /// A lone expression with no static text around it
    pub fn is_single_expression(&self) -> bool {
        self.strings.is_none()
    }
}

/// What a sanitizer is about to guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizeKind {
    /// Text node data or a host property
    Property,
    Attribute,
}

/// Value transform applied before a write
pub type ValueSanitizer = Rc<dyn Fn(&Value) -> Value>;

/// Builds the sanitizer of one part from `(node, name, kind)`.
///
/// Consulted once per part, on its first write.
pub type SanitizerFactory = Rc<dyn Fn(NodeId, &str, SanitizeKind) -> ValueSanitizer>;

/// Factory installed by `EngineConfig::sanitize`: writes pass through
/// unchanged, but raw-text bindings are refused.
pub(crate) fn pass_through_factory() -> SanitizerFactory {
    Rc::new(|_: NodeId, _: &str, _: SanitizeKind| -> ValueSanitizer {
        Rc::new(|value: &Value| value.clone())
    })
}
