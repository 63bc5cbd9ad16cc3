//! `class_map`: toggle individual classes of the `class` attribute

use std::collections::{BTreeSet, HashSet};

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::error::TemplateError;
use crate::host::{Host, NodeId};
use crate::part::{PartInfo, PartType};
use crate::runtime::Runtime;
use crate::value::Value;

#[derive(Clone)]
pub(crate) struct ClassMapArgs {
    entries: Vec<(String, bool)>,
}

#[derive(Default)]
pub(crate) struct ClassMapState {
    /// Classes this directive added; `None` before the first render
    previous: Option<BTreeSet<String>>,
    /// Classes written literally in the attribute, never touched
    statics: HashSet<String>,
}

/// Set each class whose flag is true.
///
/// Must be the only binding in a `class` attribute; static classes around
/// it are left alone. After the first render only changed classes are
/// added or removed on the element.
pub fn class_map<I, K>(entries: I) -> DirectiveResult
where
    I: IntoIterator<Item = (K, bool)>,
    K: Into<String>,
{
    DirectiveResult::new(DirectiveCall::ClassMap(ClassMapArgs {
        entries: entries.into_iter().map(|(name, on)| (name.into(), on)).collect(),
    }))
}

pub(crate) fn validate(info: &PartInfo) -> Result<(), TemplateError> {
    let in_class = info.ty == PartType::Attribute && info.name.as_deref() == Some("class");
    if !in_class || info.strings.map_or(false, |n| n > 2) {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "class_map",
            reason: "can only be used in the `class` attribute and must be the only part in the attribute",
        });
    }
    Ok(())
}

pub(crate) fn update(
    rt: &mut Runtime,
    host: &mut dyn Host,
    site: Site,
    state: &mut ClassMapState,
    args: ClassMapArgs,
) -> Result<Value, TemplateError> {
    let attr = rt.attribute(site.part)?;
    let element = attr.element;

    let Some(previous) = &mut state.previous else {
        if let Some(strings) = &attr.strings {
            state.statics = strings
                .iter()
                .flat_map(|s| s.split_whitespace())
                .map(str::to_string)
                .collect();
        }
        let added: BTreeSet<String> = args
            .entries
            .iter()
            .filter(|(name, on)| *on && !state.statics.contains(name))
            .map(|(name, _)| name.clone())
            .collect();
        let mut on: Vec<&str> = Vec::new();
        for (name, _) in &args.entries {
            if added.contains(name) && !on.contains(&name.as_str()) {
                on.push(name);
            }
        }
        let rendered = format!(" {} ", on.join(" "));
        state.previous = Some(added);
        return Ok(Value::from(rendered));
    };

    let gone: Vec<String> = previous
        .iter()
        .filter(|name| !args.entries.iter().any(|(entry, _)| entry == *name))
        .cloned()
        .collect();
    for name in gone {
        remove_class(host, element, &name);
        previous.remove(&name);
    }
    for (name, on) in &args.entries {
        if *on == previous.contains(name) || state.statics.contains(name) {
            continue;
        }
        if *on {
            add_class(host, element, name);
            previous.insert(name.clone());
        } else {
            remove_class(host, element, name);
            previous.remove(name);
        }
    }
    Ok(Value::NoChange)
}

/// Classes on the element, first occurrence of each
fn class_list(host: &dyn Host, element: NodeId) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    if let Some(class) = host.get_attribute(element, "class") {
        for name in class.split_whitespace() {
            if !classes.iter().any(|c| c == name) {
                classes.push(name.to_string());
            }
        }
    }
    classes
}

fn add_class(host: &mut dyn Host, element: NodeId, name: &str) {
    let mut classes = class_list(host, element);
    if !classes.iter().any(|c| c == name) {
        classes.push(name.to_string());
    }
    host.set_attribute(element, "class", &classes.join(" "));
}

fn remove_class(host: &mut dyn Host, element: NodeId, name: &str) {
    if !host.has_attribute(element, "class") {
        return;
    }
    let mut classes = class_list(host, element);
    classes.retain(|c| c != name);
    host.set_attribute(element, "class", &classes.join(" "));
}
