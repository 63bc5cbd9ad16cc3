//! Child parts: a range of sibling nodes between two markers

use std::mem;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{SanitizeKind, ValueSanitizer};
use crate::error::TemplateError;
use crate::host::{contains, Host, NodeId};
use crate::runtime::{Committed, Entry, Key, Runtime};
use crate::value::{TemplateResult, Value};

/// Owns the nodes strictly between `start` and `end` (`None`: the end of
/// the parent).
pub(crate) struct ChildPart {
    pub(crate) start: NodeId,
    pub(crate) end: Option<NodeId>,
    pub(crate) committed: Committed,
    /// Connection flag of a root part; interior parts read their root's
    pub(crate) connected: bool,
    pub(crate) text_sanitizer: Option<ValueSanitizer>,
}

impl Runtime {
    pub(crate) fn new_child_part(
        &mut self,
        start: NodeId,
        end: Option<NodeId>,
        parent: Option<Key>,
        connected: bool,
    ) -> Key {
        self.insert(
            Entry::Child(ChildPart {
                start,
                end,
                committed: Committed::Nothing,
                connected,
                text_sanitizer: None,
            }),
            parent,
        )
    }

    /// Resolve directives on `value` and commit the result to `part`
    pub(crate) fn set_child_value(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        value: Value,
        directive_parent: Key,
    ) -> Result<(), TemplateError> {
        let value = self.resolve_directive(host, part, value, directive_parent, None)?;
        match value {
            Value::NoChange => Ok(()),
            Value::Nothing => self.commit_nothing(host, part),
            Value::Str(ref s) if s.is_empty() => self.commit_nothing(host, part),
            Value::Template(result) => self.commit_template_result(host, part, result),
            Value::Node(node) => self.commit_node(host, part, node),
            Value::List(items) => self.commit_iterable(host, part, items),
            other => {
                let unchanged = matches!(
                    &self.child(part)?.committed,
                    Committed::Primitive(previous) if previous.same_value(&other)
                );
                if unchanged {
                    Ok(())
                } else {
                    self.commit_text(host, part, other)
                }
            }
        }
    }

    fn commit_nothing(&mut self, host: &mut dyn Host, part: Key) -> Result<(), TemplateError> {
        let child = self.child(part)?;
        if !matches!(child.committed, Committed::Nothing) {
            let from = host.next_sibling(child.start);
            self.clear_child(host, part, from, 0)?;
        }
        let old = mem::take(&mut self.child_mut(part)?.committed);
        self.release_committed(old);
        Ok(())
    }

    fn commit_text(&mut self, host: &mut dyn Host, part: Key, value: Value) -> Result<(), TemplateError> {
        let child = self.child(part)?;
        let existing = match child.committed {
            Committed::Primitive(_) => host.next_sibling(child.start),
            _ => None,
        };

        match existing {
            Some(node) => {
                let text = self.sanitize_text(part, node, &value)?;
                host.set_text(node, &text);
            }
            None if self.sanitizer.is_some() => {
                let node = host.create_text("");
                self.commit_node(host, part, node)?;
                let text = self.sanitize_text(part, node, &value)?;
                host.set_text(node, &text);
            }
            None => {
                let node = host.create_text(&value.to_text());
                self.commit_node(host, part, node)?;
            }
        }

        trace!(%part, value = ?value, "committed text");
        self.child_mut(part)?.committed = Committed::Primitive(value);
        Ok(())
    }

    fn sanitize_text(&mut self, part: Key, node: NodeId, value: &Value) -> Result<String, TemplateError> {
        let Some(factory) = self.sanitizer.clone() else {
            return Ok(value.to_text());
        };
        let sanitizer = self
            .child_mut(part)?
            .text_sanitizer
            .get_or_insert_with(|| factory(node, "data", SanitizeKind::Property))
            .clone();
        Ok(sanitizer(value).to_text())
    }

    /// Replace the part's content with `node`
    pub(crate) fn commit_node(&mut self, host: &mut dyn Host, part: Key, node: NodeId) -> Result<(), TemplateError> {
        let child = self.child(part)?;
        if matches!(child.committed, Committed::Node(current) if current == node) {
            return Ok(());
        }
        let (start, end) = (child.start, child.end);
        let container = host.parent(start).ok_or(TemplateError::StaleHandle)?;

        if contains(host, node, container) {
            return Err(TemplateError::NodeIntoItself);
        }
        if self.sanitizer.is_some() {
            if let Some(tag) = host.tag_name(container) {
                if tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style") {
                    return Err(TemplateError::ForbiddenRawTextBinding {
                        element: tag.to_ascii_lowercase(),
                    });
                }
            }
        }

        let from = host.next_sibling(start);
        self.clear_child(host, part, from, 0)?;
        host.insert_before(container, node, end);
        let old = mem::replace(&mut self.child_mut(part)?.committed, Committed::Node(node));
        self.release_committed(old);
        Ok(())
    }

    fn commit_template_result(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        result: TemplateResult,
    ) -> Result<(), TemplateError> {
        let slots = result.strings().len().saturating_sub(1);
        if result.values().len() != slots {
            return Err(TemplateError::ValueCountMismatch {
                slots,
                values: result.values().len(),
            });
        }

        let template = self.template_for(host, &result)?;
        let current = match self.child(part)?.committed {
            Committed::Instance(instance) => Some(instance),
            _ => None,
        };
        if let Some(instance) = current {
            if Rc::ptr_eq(&self.instance(instance)?.template, &template) {
                trace!(%part, %instance, "updating instance in place");
                return self.update_instance(host, instance, result.values());
            }
        }

        let instance = self.new_instance(template, part);
        let fragment = self.clone_instance(host, instance)?;
        self.update_instance(host, instance, result.values())?;
        self.commit_node(host, part, fragment)?;
        self.child_mut(part)?.committed = Committed::Instance(instance);
        debug!(%part, %instance, "created template instance");
        Ok(())
    }

    fn commit_iterable(&mut self, host: &mut dyn Host, part: Key, items: Vec<Value>) -> Result<(), TemplateError> {
        if !matches!(self.child(part)?.committed, Committed::Items(_)) {
            // detach whatever was there before the list takes over
            let from = host.next_sibling(self.child(part)?.start);
            self.clear_child(host, part, from, 0)?;
            let old = mem::replace(&mut self.child_mut(part)?.committed, Committed::Items(Vec::new()));
            self.release_committed(old);
        }

        let mut index = 0;
        let mut last: Option<Key> = None;
        for item in items {
            let existing = match &self.child(part)?.committed {
                Committed::Items(parts) => parts.get(index).copied(),
                _ => None,
            };
            let item_part = match existing {
                Some(item_part) => item_part,
                None => {
                    let item_part = self.insert_item_part(host, part, None, None)?;
                    if let Committed::Items(parts) = &mut self.child_mut(part)?.committed {
                        parts.push(item_part);
                    }
                    item_part
                }
            };
            self.set_child_value(host, item_part, item, item_part)?;
            last = Some(item_part);
            index += 1;
        }

        let count = match &self.child(part)?.committed {
            Committed::Items(parts) => parts.len(),
            _ => 0,
        };
        if index < count {
            let from = match last {
                Some(item_part) => self.child(item_part)?.end.and_then(|end| host.next_sibling(end)),
                None => host.next_sibling(self.child(part)?.start),
            };
            self.clear_child(host, part, from, index)?;
            let removed = match &mut self.child_mut(part)?.committed {
                Committed::Items(parts) => parts.split_off(index),
                _ => Vec::new(),
            };
            trace!(%part, removed = removed.len(), "truncated list");
            for item_part in removed {
                self.release(item_part);
            }
        }
        Ok(())
    }

    /// Detach the committed subtree from `from_index` and remove the nodes
    /// from `from` up to the end marker.
    pub(crate) fn clear_child(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        from: Option<NodeId>,
        from_index: usize,
    ) -> Result<(), TemplateError> {
        self.notify_child_part_connection(part, false, true, from_index);
        let end = self.child(part)?.end;
        let mut node = from;
        while let Some(current) = node {
            if Some(current) == end {
                break;
            }
            node = host.next_sibling(current);
            host.remove(current);
        }
        Ok(())
    }

    /// Create an item part of `container` before `before` (the container's
    /// end when `None`), or move `existing` there.
    pub(crate) fn insert_item_part(
        &mut self,
        host: &mut dyn Host,
        container: Key,
        before: Option<Key>,
        existing: Option<Key>,
    ) -> Result<Key, TemplateError> {
        let outer = self.child(container)?;
        let parent = host.parent(outer.start).ok_or(TemplateError::StaleHandle)?;
        let reference = match before {
            Some(before) => Some(self.child(before)?.start),
            None => outer.end,
        };

        let Some(part) = existing else {
            let start = host.create_comment("");
            host.insert_before(parent, start, reference);
            let end = host.create_comment("");
            host.insert_before(parent, end, reference);
            return Ok(self.new_child_part(start, Some(end), Some(container), true));
        };

        let moved = self.child(part)?;
        let stop = moved.end.and_then(|end| host.next_sibling(end));
        if stop != reference {
            let mut node = Some(moved.start);
            while let Some(current) = node {
                if Some(current) == stop {
                    break;
                }
                node = host.next_sibling(current);
                host.insert_before(parent, current, reference);
            }
        }
        Ok(part)
    }

    /// Detach and remove an item part with all its nodes, then release it
    pub(crate) fn remove_item_part(&mut self, host: &mut dyn Host, part: Key) -> Result<(), TemplateError> {
        self.notify_child_part_connection(part, false, true, 0);
        let child = self.child(part)?;
        let stop = child.end.and_then(|end| host.next_sibling(end));
        let mut node = Some(child.start);
        while let Some(current) = node {
            if Some(current) == stop {
                break;
            }
            node = host.next_sibling(current);
            host.remove(current);
        }
        self.release(part);
        Ok(())
    }

    /// Forget the committed value so the next commit starts from scratch.
    ///
    /// The old nodes stay until that commit clears them.
    pub(crate) fn reset_child(&mut self, part: Key) -> Result<(), TemplateError> {
        self.notify_child_part_connection(part, false, true, 0);
        let old = mem::replace(&mut self.child_mut(part)?.committed, Committed::Reset);
        self.release_committed(old);
        Ok(())
    }

    /// Flip a root part's connection state and propagate it
    pub(crate) fn set_root_connected(&mut self, part: Key, connected: bool) -> Result<(), TemplateError> {
        if self.tree.parent(part).is_some() {
            return Err(TemplateError::StaleHandle);
        }
        self.child_mut(part)?.connected = connected;
        self.notify_child_part_connection(part, connected, false, 0);
        Ok(())
    }
}
