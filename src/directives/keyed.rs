//! `keyed`: tie a child binding's content to a key

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::error::TemplateError;
use crate::part::{PartInfo, PartType};
use crate::runtime::Runtime;
use crate::value::{ItemKey, Value};

#[derive(Clone)]
pub(crate) struct KeyedArgs {
    key: ItemKey,
    value: Box<Value>,
}

#[derive(Default)]
pub(crate) struct KeyedState {
    key: Option<ItemKey>,
}

/// Render `value`, throwing away the previous content (and any instance it
/// holds) whenever `key` changes.
pub fn keyed(key: impl Into<ItemKey>, value: impl Into<Value>) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::Keyed(KeyedArgs {
        key: key.into(),
        value: Box::new(value.into()),
    }))
}

pub(crate) fn validate(info: &PartInfo) -> Result<(), TemplateError> {
    if info.ty != PartType::Child {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "keyed",
            reason: "can only be used in child bindings",
        });
    }
    Ok(())
}

pub(crate) fn update(
    rt: &mut Runtime,
    site: Site,
    state: &mut KeyedState,
    args: KeyedArgs,
) -> Result<Value, TemplateError> {
    if state.key.as_ref() != Some(&args.key) {
        rt.reset_child(site.part)?;
        state.key = Some(args.key);
    }
    Ok(*args.value)
}
