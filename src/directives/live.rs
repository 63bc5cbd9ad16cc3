//! `live`: compare against the host's current state instead of the last
//! committed value

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::error::TemplateError;
use crate::host::Host;
use crate::part::{PartInfo, PartType};
use crate::runtime::Runtime;
use crate::template::AttributeFlavor;
use crate::value::Value;

/// Re-commit `value` whenever the live attribute or property differs from
/// it, even if the template value itself did not change.
pub fn live(value: impl Into<Value>) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::Live(Box::new(value.into())))
}

pub(crate) fn validate(info: &PartInfo) -> Result<(), TemplateError> {
    if !matches!(
        info.ty,
        PartType::Attribute | PartType::Property | PartType::BooleanAttribute
    ) {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "live",
            reason: "is not allowed on child or event bindings",
        });
    }
    if !info.is_single_expression() {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "live",
            reason: "bindings can only contain a single expression",
        });
    }
    Ok(())
}

pub(crate) fn update(
    rt: &mut Runtime,
    host: &mut dyn Host,
    site: Site,
    value: Value,
) -> Result<Value, TemplateError> {
    if matches!(value, Value::NoChange | Value::Nothing) {
        return Ok(value);
    }

    let attr = rt.attribute(site.part)?;
    let (element, name) = (attr.element, attr.name.as_str());
    let in_sync = match attr.flavor {
        AttributeFlavor::Property => host
            .get_property(element, name)
            .map_or(false, |current| current.same_value(&value)),
        AttributeFlavor::Boolean => value.is_truthy() == host.has_attribute(element, name),
        AttributeFlavor::Attribute | AttributeFlavor::Event => {
            host.get_attribute(element, name).as_deref() == Some(value.to_text().as_str())
        }
    };
    if in_sync {
        return Ok(Value::NoChange);
    }

    rt.reset_attribute(site.part, 0)?;
    Ok(value)
}
