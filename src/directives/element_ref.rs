//! `element_ref`: expose the bound element to outside code

use std::cell::Cell;
use std::rc::Rc;

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::error::TemplateError;
use crate::host::NodeId;
use crate::part::{PartInfo, PartType};
use crate::runtime::Runtime;
use crate::value::Value;

/// Shared slot holding an element while its binding is connected
#[derive(Debug, Clone, Default)]
pub struct ElementRef {
    slot: Rc<Cell<Option<NodeId>>>,
}

impl ElementRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<NodeId> {
        self.slot.get()
    }

    fn set(&self, element: Option<NodeId>) {
        self.slot.set(element);
    }

    fn ptr_eq(&self, other: &ElementRef) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

#[derive(Default)]
pub(crate) struct ElementRefState {
    target: Option<ElementRef>,
    element: Option<NodeId>,
}

/// Bind in element position: `<input ${element_ref(&r)}>`
pub fn element_ref(target: &ElementRef) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::ElementRef(target.clone()))
}

pub(crate) fn validate(info: &PartInfo) -> Result<(), TemplateError> {
    if info.ty != PartType::Element {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "element_ref",
            reason: "can only be used in element bindings",
        });
    }
    Ok(())
}

pub(crate) fn update(
    rt: &mut Runtime,
    site: Site,
    state: &mut ElementRefState,
    target: ElementRef,
) -> Result<Value, TemplateError> {
    let element = rt.element(site.part)?.element;
    if let Some(previous) = &state.target {
        if !previous.ptr_eq(&target) && previous.get() == Some(element) {
            previous.set(None);
        }
    }
    if site.connected {
        target.set(Some(element));
    }
    state.target = Some(target);
    state.element = Some(element);
    Ok(Value::NoChange)
}

pub(crate) fn connection_changed(state: &mut ElementRefState, connected: bool) {
    if let Some(target) = &state.target {
        target.set(if connected { state.element } else { None });
    }
}
