//! Directive protocol
//!
//! A directive result is a call (which directive, with which arguments)
//! bound into a slot. On first sight at a binding site it gets a directive
//! instance with its own state, keyed by the site's parent and slot; later
//! renders feed new arguments to the same instance while the directive kind
//! stays the same.

use std::fmt;

use tracing::trace;

use crate::directives::{
    self, AsyncReplaceArgs, ClassMapArgs, ElementRef, GuardArgs, KeyedArgs, RepeatArgs,
    UnsafeMarkupArgs,
};
use crate::error::TemplateError;
use crate::host::Host;
use crate::part::PartInfo;
use crate::runtime::{Entry, Key, Runtime};
use crate::value::Value;

/// Which built-in directive a result invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Repeat,
    AsyncReplace,
    UnsafeHtml,
    UnsafeSvg,
    Guard,
    Live,
    ClassMap,
    Keyed,
    ElementRef,
}

impl DirectiveKind {
    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Repeat => "repeat",
            DirectiveKind::AsyncReplace => "async_replace",
            DirectiveKind::UnsafeHtml => "unsafe_html",
            DirectiveKind::UnsafeSvg => "unsafe_svg",
            DirectiveKind::Guard => "guard",
            DirectiveKind::Live => "live",
            DirectiveKind::ClassMap => "class_map",
            DirectiveKind::Keyed => "keyed",
            DirectiveKind::ElementRef => "element_ref",
        }
    }

    /// Lifecycle-aware directives track connection and get hooks
    pub fn is_async(self) -> bool {
        matches!(self, DirectiveKind::AsyncReplace | DirectiveKind::ElementRef)
    }

    /// Check the binding site before an instance is created
    pub(crate) fn validate(self, info: &PartInfo) -> Result<(), TemplateError> {
        match self {
            DirectiveKind::Repeat => directives::repeat::validate(info),
            DirectiveKind::UnsafeHtml | DirectiveKind::UnsafeSvg => {
                directives::unsafe_markup::validate(self, info)
            }
            DirectiveKind::Live => directives::live::validate(info),
            DirectiveKind::ClassMap => directives::class_map::validate(info),
            DirectiveKind::Keyed => directives::keyed::validate(info),
            DirectiveKind::ElementRef => directives::element_ref::validate(info),
            DirectiveKind::AsyncReplace | DirectiveKind::Guard => Ok(()),
        }
    }
}

/// Arguments of one directive call
#[derive(Clone)]
pub(crate) enum DirectiveCall {
    Repeat(RepeatArgs),
    AsyncReplace(AsyncReplaceArgs),
    UnsafeMarkup(UnsafeMarkupArgs),
    Guard(GuardArgs),
    Live(Box<Value>),
    ClassMap(ClassMapArgs),
    Keyed(KeyedArgs),
    ElementRef(ElementRef),
}

impl DirectiveCall {
    fn kind(&self) -> DirectiveKind {
        match self {
            DirectiveCall::Repeat(_) => DirectiveKind::Repeat,
            DirectiveCall::AsyncReplace(_) => DirectiveKind::AsyncReplace,
            DirectiveCall::UnsafeMarkup(args) => args.kind(),
            DirectiveCall::Guard(_) => DirectiveKind::Guard,
            DirectiveCall::Live(_) => DirectiveKind::Live,
            DirectiveCall::ClassMap(_) => DirectiveKind::ClassMap,
            DirectiveCall::Keyed(_) => DirectiveKind::Keyed,
            DirectiveCall::ElementRef(_) => DirectiveKind::ElementRef,
        }
    }
}

/// A directive invocation, bindable like any other value
#[derive(Clone)]
pub struct DirectiveResult {
    call: DirectiveCall,
}

impl DirectiveResult {
    pub(crate) fn new(call: DirectiveCall) -> Self {
        Self { call }
    }

    pub fn kind(&self) -> DirectiveKind {
        self.call.kind()
    }
}

impl fmt::Debug for DirectiveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DirectiveResult").field(&self.kind()).finish()
    }
}

/// Per-instance state of each directive
pub(crate) enum DirectiveState {
    Repeat(directives::repeat::RepeatState),
    AsyncReplace(directives::async_replace::AsyncReplaceState),
    UnsafeMarkup(directives::unsafe_markup::UnsafeMarkupState),
    Guard(directives::guard::GuardState),
    Live,
    ClassMap(directives::class_map::ClassMapState),
    Keyed(directives::keyed::KeyedState),
    ElementRef(directives::element_ref::ElementRefState),
}

impl DirectiveState {
    fn new(kind: DirectiveKind) -> Self {
        match kind {
            DirectiveKind::Repeat => DirectiveState::Repeat(Default::default()),
            DirectiveKind::AsyncReplace => DirectiveState::AsyncReplace(Default::default()),
            DirectiveKind::UnsafeHtml | DirectiveKind::UnsafeSvg => {
                DirectiveState::UnsafeMarkup(Default::default())
            }
            DirectiveKind::Guard => DirectiveState::Guard(Default::default()),
            DirectiveKind::Live => DirectiveState::Live,
            DirectiveKind::ClassMap => DirectiveState::ClassMap(Default::default()),
            DirectiveKind::Keyed => DirectiveState::Keyed(Default::default()),
            DirectiveKind::ElementRef => DirectiveState::ElementRef(Default::default()),
        }
    }
}

/// A directive instance in the arena
pub(crate) struct DirectiveEntry {
    pub(crate) kind: DirectiveKind,
    /// The part the directive ultimately writes to
    pub(crate) part: Key,
    pub(crate) slot: Option<usize>,
    /// Cached connection state; kept current for lifecycle-aware kinds only
    pub(crate) connected: bool,
    /// Taken out while the directive runs
    pub(crate) state: Option<DirectiveState>,
}

/// Where a running directive is bound
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site {
    pub(crate) directive: Key,
    pub(crate) part: Key,
    pub(crate) connected: bool,
}

impl Runtime {
    /// Run any directive in `value` and return what is left to commit.
    ///
    /// The instance for `(parent, slot)` is replaced when the directive kind
    /// changes; `NoChange` leaves it attached without running it.
    pub(crate) fn resolve_directive(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        value: Value,
        parent: Key,
        slot: Option<usize>,
    ) -> Result<Value, TemplateError> {
        if matches!(value, Value::NoChange) {
            return Ok(value);
        }

        let attached = self
            .directive_slots
            .get(&parent)
            .and_then(|slots| slots.get(&slot))
            .copied();
        let attached_kind = attached.and_then(|d| self.directive(d).ok().map(|entry| entry.kind));
        let wanted_kind = match &value {
            Value::Directive(result) => Some(result.kind()),
            _ => None,
        };

        let mut current = attached;
        if attached_kind != wanted_kind {
            if let Some(old) = current.take() {
                self.notify_directive_connection(old, false, true);
                if let Some(slots) = self.directive_slots.get_mut(&parent) {
                    slots.remove(&slot);
                }
                self.release(old);
            }
            if let Some(kind) = wanted_kind {
                kind.validate(&self.part_info(part)?)?;
                current = Some(self.create_directive(kind, part, parent, slot));
            }
        }

        match (current, value) {
            (Some(directive), Value::Directive(result)) => {
                let next = self.run_directive(host, directive, part, result.call)?;
                self.resolve_directive(host, part, next, directive, slot)
            }
            (_, value) => Ok(value),
        }
    }

    fn create_directive(&mut self, kind: DirectiveKind, part: Key, parent: Key, slot: Option<usize>) -> Key {
        let connected = self.is_connected(part);
        let directive = self.insert(
            Entry::Directive(DirectiveEntry {
                kind,
                part,
                slot,
                connected,
                state: Some(DirectiveState::new(kind)),
            }),
            Some(parent),
        );
        self.directive_slots
            .entry(parent)
            .or_default()
            .insert(slot, directive);
        if kind.is_async() {
            self.tree.add_disconnectable(directive);
            self.async_directives.insert(directive);
        }
        trace!(%directive, %part, directive_kind = kind.name(), "created directive");
        directive
    }

    fn run_directive(
        &mut self,
        host: &mut dyn Host,
        directive: Key,
        part: Key,
        call: DirectiveCall,
    ) -> Result<Value, TemplateError> {
        let entry = self.directive_mut(directive)?;
        let site = Site {
            directive,
            part,
            connected: entry.connected,
        };
        let mut state = entry.state.take().ok_or(TemplateError::StaleHandle)?;

        let output = match (&mut state, call) {
            (DirectiveState::Repeat(state), DirectiveCall::Repeat(args)) => {
                directives::repeat::update(self, host, site, state, args)
            }
            (DirectiveState::AsyncReplace(state), DirectiveCall::AsyncReplace(args)) => {
                Ok(directives::async_replace::update(site, state, args))
            }
            (DirectiveState::UnsafeMarkup(state), DirectiveCall::UnsafeMarkup(args)) => {
                directives::unsafe_markup::update(state, args)
            }
            (DirectiveState::Guard(state), DirectiveCall::Guard(args)) => {
                Ok(directives::guard::update(state, args))
            }
            (DirectiveState::Live, DirectiveCall::Live(value)) => {
                directives::live::update(self, host, site, *value)
            }
            (DirectiveState::ClassMap(state), DirectiveCall::ClassMap(args)) => {
                directives::class_map::update(self, host, site, state, args)
            }
            (DirectiveState::Keyed(state), DirectiveCall::Keyed(args)) => {
                directives::keyed::update(self, site, state, args)
            }
            (DirectiveState::ElementRef(state), DirectiveCall::ElementRef(target)) => {
                directives::element_ref::update(self, site, state, target)
            }
            _ => Err(TemplateError::StaleHandle),
        };

        if let Ok(entry) = self.directive_mut(directive) {
            entry.state = Some(state);
        }
        output
    }

    /// Commit a value on behalf of a directive, outside a render.
    ///
    /// Interpolated attributes keep their other slots as committed.
    pub(crate) fn directive_set_value(
        &mut self,
        host: &mut dyn Host,
        directive: Key,
        value: Value,
    ) -> Result<(), TemplateError> {
        let entry = self.directive(directive)?;
        let (part, slot) = (entry.part, entry.slot);

        let interpolated = match self.arena.get(part) {
            Some(Entry::Attribute(attr)) if attr.strings.is_some() => Some(attr.slots()),
            _ => None,
        };
        match interpolated {
            Some(slots) => {
                let mut values = vec![Value::NoChange; slots];
                if let Some(target) = slot.and_then(|slot| values.get_mut(slot)) {
                    *target = value;
                }
                self.set_attribute_part(host, part, &values, directive)
            }
            None => self.set_part_value(host, part, value, directive),
        }
    }

    /// Deliver the newest unseen producer value of every connected
    /// `async_replace` instance. Returns the number of commits.
    pub(crate) fn flush(&mut self, host: &mut dyn Host) -> Result<usize, TemplateError> {
        let pending: Vec<Key> = self.async_directives.iter().copied().collect();
        let mut commits = 0;
        for directive in pending {
            let ready = match self.arena.get_mut(directive) {
                Some(Entry::Directive(DirectiveEntry {
                    connected,
                    state: Some(DirectiveState::AsyncReplace(state)),
                    ..
                })) => {
                    if !*connected {
                        if state.has_pending() {
                            trace!(%directive, "holding values while disconnected");
                        }
                        continue;
                    }
                    state.take_latest()
                }
                _ => None,
            };
            if let Some(value) = ready {
                self.directive_set_value(host, directive, value)?;
                commits += 1;
            }
        }
        Ok(commits)
    }
}
