//! Template instances: one cloned content tree plus its parts

use std::rc::Rc;

use super::build::{AttributeFlavor, Template, TemplatePart};
use crate::error::TemplateError;
use crate::host::{next_in_walk, Host, NodeId};
use crate::runtime::{Entry, Key, Runtime};
use crate::value::Value;

/// A clone of a template's content with a part per descriptor.
///
/// `parts` lines up with the template's descriptors; comment descriptors
/// get `None`.
pub(crate) struct TemplateInstance {
    pub(crate) template: Rc<Template>,
    pub(crate) parts: Vec<Option<Key>>,
}

impl Runtime {
    pub(crate) fn new_instance(&mut self, template: Rc<Template>, parent: Key) -> Key {
        self.insert(
            Entry::Instance(TemplateInstance {
                template,
                parts: Vec::new(),
            }),
            Some(parent),
        )
    }

    /// Clone the template content and create the instance's parts.
    ///
    /// Returns the cloned fragment, ready to be inserted.
    pub(crate) fn clone_instance(&mut self, host: &mut dyn Host, instance: Key) -> Result<NodeId, TemplateError> {
        let template = Rc::clone(&self.instance(instance)?.template);
        let fragment = host.clone_subtree(template.content());

        let mut parts = Vec::with_capacity(template.parts().len());
        let mut descriptors = template.parts().iter().peekable();
        let mut node = next_in_walk(host, fragment, fragment);
        let mut node_index = 0;

        while let (Some(descriptor), Some(current)) = (descriptors.peek(), node) {
            if descriptor.index() != node_index {
                node = next_in_walk(host, fragment, current);
                node_index += 1;
                continue;
            }
            let part = match descriptor {
                TemplatePart::Child { .. } => {
                    let end = host.next_sibling(current);
                    Some(self.new_child_part(current, end, Some(instance), true))
                }
                TemplatePart::Attribute {
                    name,
                    flavor: AttributeFlavor::Event,
                    ..
                } => Some(self.new_event_part(current, name, instance)),
                TemplatePart::Attribute {
                    name,
                    flavor,
                    strings,
                    ..
                } => Some(self.new_attribute_part(current, name, *flavor, strings, instance)),
                TemplatePart::Element { .. } => Some(self.new_element_part(current, instance)),
                TemplatePart::Comment { .. } => None,
            };
            parts.push(part);
            descriptors.next();
        }

        self.instance_mut(instance)?.parts = parts;
        Ok(fragment)
    }

    /// Feed `values` to the instance's parts, in slot order
    pub(crate) fn update_instance(
        &mut self,
        host: &mut dyn Host,
        instance: Key,
        values: &[Value],
    ) -> Result<(), TemplateError> {
        let parts = self.instance(instance)?.parts.clone();
        let mut index = 0;
        for part in parts {
            let Some(part) = part else {
                // comment bindings consume their value without writing it
                index += 1;
                continue;
            };
            let slots = match self.arena.get(part) {
                Some(Entry::Attribute(attr)) => attr.slots(),
                _ => 1,
            };
            let Some(chunk) = values.get(index..index + slots) else {
                return Err(TemplateError::ValueCountMismatch {
                    slots: index + slots,
                    values: values.len(),
                });
            };
            match self.arena.get(part) {
                Some(Entry::Attribute(_)) => self.set_attribute_part(host, part, chunk, part)?,
                _ => {
                    let value = chunk.first().cloned().unwrap_or_default();
                    self.set_part_value(host, part, value, part)?
                }
            }
            index += slots;
        }
        Ok(())
    }
}
