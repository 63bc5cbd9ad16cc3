//! Attribute, property and boolean-attribute parts

use std::rc::Rc;

use tracing::trace;

use super::{SanitizeKind, ValueSanitizer};
use crate::error::TemplateError;
use crate::host::{Host, NodeId};
use crate::runtime::{Entry, Key, Runtime};
use crate::template::AttributeFlavor;
use crate::value::Value;

/// One bound attribute of an element.
///
/// A value made of a lone expression is *single*; anything with static
/// text around or between expressions is *interpolated* and keeps its
/// static strings.
pub(crate) struct AttributePart {
    pub(crate) element: NodeId,
    pub(crate) name: String,
    pub(crate) flavor: AttributeFlavor,
    pub(crate) strings: Option<Rc<[String]>>,
    /// Last value per slot; `None` never compares equal
    pub(crate) committed: Vec<Option<Value>>,
    pub(crate) sanitizer: Option<ValueSanitizer>,
}

impl AttributePart {
    pub(crate) fn new(element: NodeId, name: &str, flavor: AttributeFlavor, strings: &[String]) -> Self {
        let interpolated = strings.len() > 2 || strings.iter().any(|s| !s.is_empty());
        let (strings, committed) = if interpolated {
            (
                Some(Rc::from(strings.to_vec())),
                vec![None; strings.len().saturating_sub(1)],
            )
        } else {
            (None, vec![Some(Value::Nothing)])
        };
        Self {
            element,
            name: name.to_string(),
            flavor,
            strings,
            committed,
            sanitizer: None,
        }
    }

    /// Number of values the part consumes
    pub(crate) fn slots(&self) -> usize {
        self.committed.len()
    }
}

impl Runtime {
    pub(crate) fn new_attribute_part(
        &mut self,
        element: NodeId,
        name: &str,
        flavor: AttributeFlavor,
        strings: &[String],
        parent: Key,
    ) -> Key {
        self.insert(
            Entry::Attribute(AttributePart::new(element, name, flavor, strings)),
            Some(parent),
        )
    }

    /// Resolve and commit `values`, one per slot.
    ///
    /// A single part reads `values[0]`. An interpolated part commits only
    /// if some slot changed, and is removed outright when any slot resolves
    /// to `Nothing`.
    pub(crate) fn set_attribute_part(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        values: &[Value],
        directive_parent: Key,
    ) -> Result<(), TemplateError> {
        let strings = self.attribute(part)?.strings.clone();
        let Some(strings) = strings else {
            let value = values.first().cloned().unwrap_or_default();
            let value = self.resolve_directive(host, part, value, directive_parent, Some(0))?;
            let attr = self.attribute_mut(part)?;
            let unchanged = matches!(attr.committed.first(), Some(Some(previous)) if previous.same_value(&value));
            let change = !value.is_primitive() || (!unchanged && !matches!(value, Value::NoChange));
            if change {
                if let Some(slot) = attr.committed.first_mut() {
                    *slot = Some(value.clone());
                }
                self.commit_attribute(host, part, value)?;
            }
            return Ok(());
        };

        let mut text = strings.first().cloned();
        let mut change = false;
        for i in 0..strings.len().saturating_sub(1) {
            let value = values.get(i).cloned().unwrap_or_default();
            let value = self.resolve_directive(host, part, value, directive_parent, Some(i))?;
            let attr = self.attribute_mut(part)?;
            let previous = attr.committed.get(i).cloned().flatten();
            let current = match value {
                Value::NoChange => previous.clone(),
                other => Some(other),
            };
            change |= match (&current, &previous) {
                (Some(current), Some(previous)) => !current.is_primitive() || !current.same_value(previous),
                _ => true,
            };
            match &current {
                Some(Value::Nothing) => text = None,
                Some(value) => {
                    if let Some(text) = &mut text {
                        text.push_str(&value.to_text());
                    }
                }
                None => {}
            }
            if let (Some(text), Some(separator)) = (&mut text, strings.get(i + 1)) {
                text.push_str(separator);
            }
            if let Some(slot) = attr.committed.get_mut(i) {
                *slot = current;
            }
        }

        if change {
            let value = text.map(Value::from).unwrap_or(Value::Nothing);
            self.commit_attribute(host, part, value)?;
        }
        Ok(())
    }

    fn commit_attribute(&mut self, host: &mut dyn Host, part: Key, value: Value) -> Result<(), TemplateError> {
        let attr = self.attribute(part)?;
        let (element, name, flavor) = (attr.element, attr.name.clone(), attr.flavor);

        match flavor {
            AttributeFlavor::Property => {
                let value = self.sanitize_attribute(part, SanitizeKind::Property, &value)?;
                host.set_property(element, &name, &value);
            }
            AttributeFlavor::Boolean => {
                if value.is_truthy() {
                    host.set_attribute(element, &name, "");
                } else {
                    host.remove_attribute(element, &name);
                }
            }
            AttributeFlavor::Attribute | AttributeFlavor::Event => {
                if value.is_nothing() {
                    host.remove_attribute(element, &name);
                } else {
                    let value = self.sanitize_attribute(part, SanitizeKind::Attribute, &value)?;
                    host.set_attribute(element, &name, &value.to_text());
                }
            }
        }
        trace!(%part, name = %name, flavor = ?flavor, "committed attribute");
        Ok(())
    }

    fn sanitize_attribute(&mut self, part: Key, kind: SanitizeKind, value: &Value) -> Result<Value, TemplateError> {
        let Some(factory) = self.sanitizer.clone() else {
            return Ok(value.clone());
        };
        let attr = self.attribute_mut(part)?;
        let (element, name) = (attr.element, attr.name.clone());
        let sanitizer = attr
            .sanitizer
            .get_or_insert_with(|| factory(element, &name, kind))
            .clone();
        Ok(sanitizer(value))
    }

    /// Make the next write to `slot` go through regardless of equality
    pub(crate) fn reset_attribute(&mut self, part: Key, slot: usize) -> Result<(), TemplateError> {
        if let Some(committed) = self.attribute_mut(part)?.committed.get_mut(slot) {
            *committed = None;
        }
        Ok(())
    }
}
