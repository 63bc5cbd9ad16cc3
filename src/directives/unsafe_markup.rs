//! `unsafe_html` and `unsafe_svg`: render a string as markup

use std::rc::Rc;

use crate::directive::{DirectiveCall, DirectiveKind, DirectiveResult};
use crate::error::TemplateError;
use crate::part::{PartInfo, PartType};
use crate::strings::TemplateStrings;
use crate::value::{ResultKind, TemplateResult, Value};

#[derive(Clone)]
pub(crate) struct UnsafeMarkupArgs {
    kind: DirectiveKind,
    value: Box<Value>,
}

impl UnsafeMarkupArgs {
    pub(crate) fn kind(&self) -> DirectiveKind {
        self.kind
    }
}

/// Last string and the result built for it
#[derive(Default)]
pub(crate) struct UnsafeMarkupState {
    last: Option<(Rc<str>, TemplateResult)>,
}

/// Parse `value` as HTML. Never pass user input.
///
/// Accepts a string, [`Value::Nothing`] (renders nothing) or
/// [`Value::NoChange`].
pub fn unsafe_html(value: impl Into<Value>) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::UnsafeMarkup(UnsafeMarkupArgs {
        kind: DirectiveKind::UnsafeHtml,
        value: Box::new(value.into()),
    }))
}

/// Parse `value` as SVG content. Never pass user input.
pub fn unsafe_svg(value: impl Into<Value>) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::UnsafeMarkup(UnsafeMarkupArgs {
        kind: DirectiveKind::UnsafeSvg,
        value: Box::new(value.into()),
    }))
}

pub(crate) fn validate(kind: DirectiveKind, info: &PartInfo) -> Result<(), TemplateError> {
    if info.ty != PartType::Child {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: kind.name(),
            reason: "can only be used in child bindings",
        });
    }
    Ok(())
}

pub(crate) fn update(state: &mut UnsafeMarkupState, args: UnsafeMarkupArgs) -> Result<Value, TemplateError> {
    let markup = match *args.value {
        Value::Nothing => {
            state.last = None;
            return Ok(Value::Nothing);
        }
        Value::NoChange => return Ok(Value::NoChange),
        Value::Str(markup) => markup,
        _ => {
            return Err(TemplateError::NonStringValue {
                directive: args.kind.name(),
            })
        }
    };

    if let Some((last, result)) = &state.last {
        if *last == markup {
            return Ok(Value::Template(result.clone()));
        }
    }

    let kind = match args.kind {
        DirectiveKind::UnsafeSvg => ResultKind::Svg,
        _ => ResultKind::Html,
    };
    let result = TemplateResult::new(TemplateStrings::intern([&*markup]), kind, Vec::new());
    state.last = Some((markup, result.clone()));
    Ok(Value::Template(result))
}
