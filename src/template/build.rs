//! Building a template from compiled markup

use tracing::debug;

use crate::compiler::{compile, Markers, BOUND_ATTRIBUTE_SUFFIX};
use crate::error::TemplateError;
use crate::host::markup::is_raw_text_element;
use crate::host::{next_in_walk, Host, NodeId, NodeKind};
use crate::strings::StringsId;
use crate::value::{ResultKind, TemplateResult};

/// How an attribute binding is written to its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFlavor {
    /// `name=${v}`: string attribute, removed when the value is absent
    Attribute,
    /// `.name=${v}`: host property
    Property,
    /// `?name=${v}`: present when truthy
    Boolean,
    /// `@name=${v}`: event listener
    Event,
}

impl AttributeFlavor {
    /// Split a bound attribute's source name into its flavor and real name
    pub fn from_source_name(name: &str) -> (Self, &str) {
        match name.as_bytes().first() {
            Some(b'.') => (AttributeFlavor::Property, &name[1..]),
            Some(b'?') => (AttributeFlavor::Boolean, &name[1..]),
            Some(b'@') => (AttributeFlavor::Event, &name[1..]),
            _ => (AttributeFlavor::Attribute, name),
        }
    }
}

/// Where one or more slots bind inside a template's content.
///
/// `index` counts element and comment nodes in pre-order from the content
/// root. An attribute descriptor with `n + 1` static strings consumes `n`
/// consecutive values; every other descriptor consumes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Child {
        index: usize,
    },
    Attribute {
        index: usize,
        name: String,
        flavor: AttributeFlavor,
        strings: Vec<String>,
    },
    Element {
        index: usize,
    },
    /// A slot inside a comment; receives its value but never writes it
    Comment {
        index: usize,
    },
}

impl TemplatePart {
    pub fn index(&self) -> usize {
        match self {
            TemplatePart::Child { index }
            | TemplatePart::Attribute { index, .. }
            | TemplatePart::Element { index }
            | TemplatePart::Comment { index } => *index,
        }
    }

    /// Number of values this descriptor consumes
    pub fn slots(&self) -> usize {
        match self {
            TemplatePart::Attribute { strings, .. } => strings.len().saturating_sub(1),
            _ => 1,
        }
    }
}

/// A compiled template: a parsed content tree plus its part descriptors
#[derive(Debug)]
pub struct Template {
    id: StringsId,
    kind: ResultKind,
    content: NodeId,
    parts: Vec<TemplatePart>,
    markup: String,
}

impl Template {
    /// Compile and parse `result`'s fragments into a template.
    ///
    /// The content tree is owned by `host` and is only ever cloned.
    pub fn build(
        host: &mut dyn Host,
        result: &TemplateResult,
        markers: &Markers,
        dev_mode: bool,
    ) -> Result<Self, TemplateError> {
        let strings = result.strings();
        if !strings.is_trusted() {
            return Err(TemplateError::UntrustedStrings);
        }

        let compiled = compile(strings, result.kind(), markers)?;
        let content = host.parse_fragment(&compiled.html);
        if result.kind() != ResultKind::Html {
            unwrap_root(host, content);
        }

        let marker = markers.marker();
        let slot_count = strings.len().saturating_sub(1);
        let mut parts = Vec::new();
        let mut consumed_names = 0;
        let mut node_index = 0;
        let mut cursor = content;

        while parts.len() < slot_count {
            let Some(node) = next_in_walk(host, content, cursor) else {
                break;
            };
            cursor = node;

            match host.kind(node) {
                NodeKind::Element => {
                    let tag = host.tag_name(node).unwrap_or_default();
                    if dev_mode && tag.eq_ignore_ascii_case("template") && subtree_mentions(host, node, marker) {
                        return Err(TemplateError::BindingInTemplateElement);
                    }

                    for name in host.attribute_names(node) {
                        if name.ends_with(BOUND_ATTRIBUTE_SUFFIX) {
                            let Some(source_name) = compiled.attribute_names.get(consumed_names) else {
                                return Err(TemplateError::DuplicateAttributeBinding {
                                    expected: compiled.attribute_names.len(),
                                    found: consumed_names + 1,
                                });
                            };
                            consumed_names += 1;
                            let value = host.get_attribute(node, &name).unwrap_or_default();
                            let (flavor, real_name) = AttributeFlavor::from_source_name(source_name);
                            let strings: Vec<String> = value.split(marker).map(String::from).collect();
                            let lone_binding =
                                strings.len() == 2 && strings.iter().all(|s| s.is_empty());
                            if flavor == AttributeFlavor::Event && !lone_binding {
                                return Err(TemplateError::InterpolatedEventBinding {
                                    element: tag.clone(),
                                    name: real_name.to_string(),
                                });
                            }
                            parts.push(TemplatePart::Attribute {
                                index: node_index,
                                name: real_name.to_string(),
                                flavor,
                                strings,
                            });
                            host.remove_attribute(node, &name);
                        } else if name.starts_with(marker) {
                            parts.push(TemplatePart::Element { index: node_index });
                            host.remove_attribute(node, &name);
                        }
                    }

                    if is_raw_text_element(&tag) {
                        let text = text_of(host, node);
                        let pieces: Vec<&str> = text.split(marker).collect();
                        if let Some((last, bound)) = pieces.split_last().filter(|(_, b)| !b.is_empty()) {
                            clear_children(host, node);
                            for piece in bound {
                                let text = host.create_text(piece);
                                host.insert_before(node, text, None);
                                let anchor = host.create_comment("");
                                host.insert_before(node, anchor, None);
                                cursor = anchor;
                                node_index += 1;
                                parts.push(TemplatePart::Child { index: node_index });
                            }
                            let text = host.create_text(last);
                            host.insert_before(node, text, None);
                            let anchor = host.create_comment("");
                            host.insert_before(node, anchor, None);
                        }
                    }
                }
                NodeKind::Comment => {
                    let data = host.text(node);
                    if data == markers.marker_match() {
                        parts.push(TemplatePart::Child { index: node_index });
                    } else {
                        for _ in data.matches(marker) {
                            parts.push(TemplatePart::Comment { index: node_index });
                        }
                    }
                }
                NodeKind::Text | NodeKind::Fragment => {}
            }
            node_index += 1;
        }

        if dev_mode && consumed_names != compiled.attribute_names.len() {
            return Err(TemplateError::DuplicateAttributeBinding {
                expected: compiled.attribute_names.len(),
                found: consumed_names,
            });
        }

        debug!(
            id = ?strings.id(),
            kind = ?result.kind(),
            parts = parts.len(),
            "compiled template"
        );

        Ok(Self {
            id: strings.id(),
            kind: result.kind(),
            content,
            parts,
            markup: compiled.html,
        })
    }

    pub fn id(&self) -> StringsId {
        self.id
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Root of the parsed content; clone it, never insert it
    pub fn content(&self) -> NodeId {
        self.content
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// The marker-annotated markup the content was parsed from
    pub fn markup(&self) -> &str {
        &self.markup
    }
}

/// Replace the `<svg>`/`<math>` wrapper with its children
fn unwrap_root(host: &mut dyn Host, content: NodeId) {
    let Some(wrapper) = host.first_child(content) else {
        return;
    };
    while let Some(child) = host.first_child(wrapper) {
        host.insert_before(content, child, Some(wrapper));
    }
    host.remove(wrapper);
}

fn text_of(host: &dyn Host, element: NodeId) -> String {
    let mut out = String::new();
    let mut child = host.first_child(element);
    while let Some(node) = child {
        if host.kind(node) == NodeKind::Text {
            out.push_str(&host.text(node));
        }
        child = host.next_sibling(node);
    }
    out
}

fn clear_children(host: &mut dyn Host, element: NodeId) {
    while let Some(child) = host.first_child(element) {
        host.remove(child);
    }
}

/// Whether any attribute, comment or text below `root` carries `marker`
fn subtree_mentions(host: &dyn Host, root: NodeId, marker: &str) -> bool {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let hit = match host.kind(node) {
            NodeKind::Element => host.attribute_names(node).iter().any(|name| {
                name.contains(marker)
                    || host
                        .get_attribute(node, name)
                        .map_or(false, |value| value.contains(marker))
            }),
            NodeKind::Text | NodeKind::Comment => host.text(node).contains(marker),
            NodeKind::Fragment => false,
        };
        if hit {
            return true;
        }
        let mut child = host.first_child(node);
        while let Some(c) = child {
            stack.push(c);
            child = host.next_sibling(c);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::strings::TemplateStrings;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn build(fragments: &[&str], kind: ResultKind) -> Result<(MemoryHost, Template), TemplateError> {
        let mut host = MemoryHost::new();
        let values = vec![Value::Nothing; fragments.len() - 1];
        let result = TemplateResult::new(TemplateStrings::intern(fragments.iter().copied()), kind, values);
        let template = Template::build(&mut host, &result, &Markers::from_seed(3), true)?;
        Ok((host, template))
    }

    #[test]
    fn test_descriptors_for_every_binding_kind() {
        let (host, template) = build(
            &["<div class=\"a ", " b\" .value=", " ?hidden=", " @click=", " ", "><!--", "-->", "</div>"],
            ResultKind::Html,
        )
        .unwrap();

        assert_eq!(
            template.parts(),
            &[
                TemplatePart::Attribute {
                    index: 0,
                    name: "class".into(),
                    flavor: AttributeFlavor::Attribute,
                    strings: vec!["a ".into(), " b".into()],
                },
                TemplatePart::Attribute {
                    index: 0,
                    name: "value".into(),
                    flavor: AttributeFlavor::Property,
                    strings: vec!["".into(), "".into()],
                },
                TemplatePart::Attribute {
                    index: 0,
                    name: "hidden".into(),
                    flavor: AttributeFlavor::Boolean,
                    strings: vec!["".into(), "".into()],
                },
                TemplatePart::Attribute {
                    index: 0,
                    name: "click".into(),
                    flavor: AttributeFlavor::Event,
                    strings: vec!["".into(), "".into()],
                },
                TemplatePart::Element { index: 0 },
                TemplatePart::Comment { index: 1 },
                TemplatePart::Child { index: 2 },
            ]
        );
        // bound attributes are stripped from the content
        insta::assert_snapshot!(host.html(template.content()), @"<div><!--lit$000000003$--><!--?lit$000000003$--></div>");
    }

    #[test]
    fn test_multi_slot_attribute() {
        let (_, template) = build(&["<p title=\"", "-", "\"></p>"], ResultKind::Html).unwrap();
        assert_eq!(template.parts().len(), 1);
        assert_eq!(template.parts()[0].slots(), 2);
    }

    #[test]
    fn test_raw_text_slots_become_child_parts() {
        let (host, template) = build(&["<style>a{color:", "}</style>"], ResultKind::Html).unwrap();
        assert_eq!(template.parts(), &[TemplatePart::Child { index: 1 }]);
        assert_eq!(host.html(template.content()), "<style>a{color:<!---->}<!----></style>");
    }

    #[test]
    fn test_svg_wrapper_is_removed() {
        let (host, template) = build(&["<circle r=", "></circle>"], ResultKind::Svg).unwrap();
        assert_eq!(host.html(template.content()), "<circle></circle>");
        assert_eq!(template.parts()[0].index(), 0);
    }

    #[test]
    fn test_binding_inside_template_element() {
        let err = build(&["<template><p>", "</p></template>"], ResultKind::Html).unwrap_err();
        assert!(matches!(err, TemplateError::BindingInTemplateElement));
    }

    #[test]
    fn test_duplicate_bound_attribute() {
        let err = build(&["<p a=", " a=", "></p>"], ResultKind::Html).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::DuplicateAttributeBinding { expected: 2, found: 1 }
        ));
    }

    #[test]
    fn test_untrusted_strings_are_refused() {
        let mut host = MemoryHost::new();
        let result = TemplateResult::new(
            TemplateStrings::untrusted(["<p>", "</p>"]),
            ResultKind::Html,
            vec![Value::Nothing],
        );
        let err = Template::build(&mut host, &result, &Markers::from_seed(3), true).unwrap_err();
        assert!(matches!(err, TemplateError::UntrustedStrings));
    }
}
