//! Element parts: a slot in attribute position with no attribute name

use crate::error::TemplateError;
use crate::host::{Host, NodeId};
use crate::runtime::{Entry, Key, Runtime};
use crate::value::Value;

pub(crate) struct ElementPart {
    pub(crate) element: NodeId,
}

impl Runtime {
    pub(crate) fn new_element_part(&mut self, element: NodeId, parent: Key) -> Key {
        self.insert(Entry::Element(ElementPart { element }), Some(parent))
    }

    /// Only runs directives; whatever they resolve to is dropped
    pub(crate) fn set_element_value(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        value: Value,
        directive_parent: Key,
    ) -> Result<(), TemplateError> {
        self.resolve_directive(host, part, value, directive_parent, None)?;
        Ok(())
    }
}
