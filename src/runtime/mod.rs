//! Live state behind a renderer
//!
//! Parts, template instances and directive instances all live in one
//! generational arena and refer to each other by [`Key`]. Parent links for
//! connection propagation sit beside them in a [`ConnectionTree`].

pub(crate) mod arena;
pub(crate) mod connection;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use tracing::trace;

use crate::compiler::Markers;
use crate::directive::DirectiveEntry;
use crate::error::TemplateError;
use crate::host::Host;
use crate::part::{
    AttributePart, ChildPart, ElementPart, EventPart, PartInfo, PartType, SanitizerFactory,
};
use crate::template::{AttributeFlavor, Template, TemplateCache, TemplateInstance};
use crate::value::{TemplateResult, Value};

pub use arena::Key;
use arena::Arena;
use connection::ConnectionTree;

/// What a child part last committed
#[derive(Debug, Clone, Default)]
pub(crate) enum Committed {
    #[default]
    Nothing,
    Primitive(Value),
    Node(crate::host::NodeId),
    Instance(Key),
    Items(Vec<Key>),
    /// Forces the next commit through, whatever it is
    Reset,
}

pub(crate) enum Entry {
    Child(ChildPart),
    Attribute(AttributePart),
    Event(EventPart),
    Element(ElementPart),
    Instance(TemplateInstance),
    Directive(DirectiveEntry),
}

pub(crate) struct Runtime {
    pub(crate) arena: Arena<Entry>,
    pub(crate) tree: ConnectionTree,
    /// Directive instances by the key they hang off and their slot
    pub(crate) directive_slots: HashMap<Key, BTreeMap<Option<usize>, Key>>,
    /// Lifecycle-aware directives, polled by `flush`
    pub(crate) async_directives: BTreeSet<Key>,
    pub(crate) cache: TemplateCache,
    pub(crate) markers: Markers,
    pub(crate) dev_mode: bool,
    pub(crate) sanitizer: Option<SanitizerFactory>,
}

macro_rules! entry_accessors {
    ($($variant:ident => $get:ident $(, $get_mut:ident)?: $ty:ty;)*) => {
        $(
            pub(crate) fn $get(&self, key: Key) -> Result<&$ty, TemplateError> {
                match self.arena.get(key) {
                    Some(Entry::$variant(entry)) => Ok(entry),
                    _ => Err(TemplateError::StaleHandle),
                }
            }

            $(
                pub(crate) fn $get_mut(&mut self, key: Key) -> Result<&mut $ty, TemplateError> {
                    match self.arena.get_mut(key) {
                        Some(Entry::$variant(entry)) => Ok(entry),
                        _ => Err(TemplateError::StaleHandle),
                    }
                }
            )?
        )*
    };
}

impl Runtime {
    pub(crate) fn new(markers: Markers, dev_mode: bool) -> Self {
        Self {
            arena: Arena::default(),
            tree: ConnectionTree::default(),
            directive_slots: HashMap::new(),
            async_directives: BTreeSet::new(),
            cache: TemplateCache::new(),
            markers,
            dev_mode,
            sanitizer: None,
        }
    }

    entry_accessors! {
        Child => child, child_mut: ChildPart;
        Attribute => attribute, attribute_mut: AttributePart;
        Event => event, event_mut: EventPart;
        Element => element: ElementPart;
        Instance => instance, instance_mut: TemplateInstance;
        Directive => directive, directive_mut: DirectiveEntry;
    }

    pub(crate) fn insert(&mut self, entry: Entry, parent: Option<Key>) -> Key {
        let key = self.arena.insert(entry);
        self.tree.attach(key, parent);
        key
    }

    /// Live arena entries
    pub(crate) fn live_entries(&self) -> usize {
        self.arena.len()
    }

    /// Compiled template for `result`, from the cache when possible
    pub(crate) fn template_for(
        &mut self,
        host: &mut dyn Host,
        result: &TemplateResult,
    ) -> Result<Rc<Template>, TemplateError> {
        self.cache
            .get_or_build(host, result, &self.markers, self.dev_mode)
    }

    /// What a directive needs to know about where it is bound
    pub(crate) fn part_info(&self, part: Key) -> Result<PartInfo, TemplateError> {
        Ok(match self.arena.get(part) {
            Some(Entry::Child(_)) => PartInfo::new(PartType::Child),
            Some(Entry::Attribute(attr)) => {
                let ty = match attr.flavor {
                    AttributeFlavor::Property => PartType::Property,
                    AttributeFlavor::Boolean => PartType::BooleanAttribute,
                    AttributeFlavor::Attribute | AttributeFlavor::Event => PartType::Attribute,
                };
                PartInfo {
                    ty,
                    name: Some(attr.name.clone()),
                    strings: attr.strings.as_ref().map(|s| s.len()),
                }
            }
            Some(Entry::Event(event)) => PartInfo {
                ty: PartType::Event,
                name: Some(event.name.clone()),
                strings: None,
            },
            Some(Entry::Element(_)) => PartInfo::new(PartType::Element),
            _ => return Err(TemplateError::StaleHandle),
        })
    }

    /// Set the value of a single-expression part
    pub(crate) fn set_part_value(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        value: Value,
        directive_parent: Key,
    ) -> Result<(), TemplateError> {
        match self.arena.get(part) {
            Some(Entry::Child(_)) => self.set_child_value(host, part, value, directive_parent),
            Some(Entry::Attribute(_)) => {
                self.set_attribute_part(host, part, std::slice::from_ref(&value), directive_parent)
            }
            Some(Entry::Event(_)) => self.set_event_value(host, part, value, directive_parent),
            Some(Entry::Element(_)) => self.set_element_value(host, part, value, directive_parent),
            _ => Err(TemplateError::StaleHandle),
        }
    }

    /// Free `key` and everything it owns: attached directives, a committed
    /// instance or item parts, an instance's parts.
    pub(crate) fn release(&mut self, key: Key) {
        if let Some(slots) = self.directive_slots.remove(&key) {
            for directive in slots.into_values() {
                self.notify_directive_connection(directive, false, true);
                self.release(directive);
            }
        }
        match self.arena.remove(key) {
            Some(Entry::Child(part)) => self.release_committed(part.committed),
            Some(Entry::Instance(instance)) => {
                for part in instance.parts.into_iter().flatten() {
                    self.release(part);
                }
            }
            Some(Entry::Directive(_)) => {
                self.async_directives.remove(&key);
            }
            Some(_) => {}
            None => return,
        }
        self.tree.forget(key);
        trace!(%key, "released");
    }

    pub(crate) fn release_committed(&mut self, committed: Committed) {
        match committed {
            Committed::Instance(instance) => self.release(instance),
            Committed::Items(items) => {
                for item in items {
                    self.release(item);
                }
            }
            _ => {}
        }
    }
}
