//! Error types for compiling and committing templates

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::strings::TemplateStrings;

/// Byte range in a template's joined source
pub type Span = std::ops::Range<usize>;

/// Everything that can go wrong while compiling a template or committing a value.
///
/// Authoring mistakes and unsafe value shapes are fatal and surface from the
/// render call that hit them. Stale async completions are not errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A slot sits where a tag name belongs
    #[error("bindings in tag names are not supported (slot {slot})")]
    DynamicTagName { slot: usize },

    /// The host de-duplicated a rewritten attribute
    #[error(
        "duplicate attribute bindings: expected {expected} bound attributes, found {found}; \
         an element may not repeat a bound attribute name"
    )]
    DuplicateAttributeBinding { expected: usize, found: usize },

    /// An `@event` binding with static text or a second slot around it
    #[error(
        "the `@{name}` listener on <{element}> has invalid content; event bindings \
         must be exactly one expression with no surrounding text"
    )]
    InterpolatedEventBinding { element: String, name: String },

    /// A slot inside a `<template>` element, which never renders its children
    #[error("bindings are not supported inside <template> elements")]
    BindingInTemplateElement,

    /// The result carries a different number of values than it has slots
    #[error("template has {slots} slots but {values} values were supplied")]
    ValueCountMismatch { slots: usize, values: usize },

    /// The fragment sequence was not produced by a template macro or the interner
    #[error("refusing to compile a fragment sequence of unknown origin")]
    UntrustedStrings,

    /// A directive was bound where it cannot work
    #[error("{directive}() {reason}")]
    UnsupportedDirectivePosition {
        directive: &'static str,
        reason: &'static str,
    },

    /// A markup-injecting directive got something other than a string
    #[error("{directive}() called with a non-string value")]
    NonStringValue { directive: &'static str },

    /// The value is the container, or one of its ancestors
    #[error("attempted to render a node into itself")]
    NodeIntoItself,

    /// Text or node bindings inside script/style while a sanitizer is active
    #[error("forbidden binding inside <{element}> while a sanitizer is active")]
    ForbiddenRawTextBinding { element: String },

    /// A part, instance or directive handle outlived its entry
    #[error("handle refers to a part that has been released")]
    StaleHandle,
}

impl TemplateError {
    /// Slot the error points at, when it has one
    pub fn slot(&self) -> Option<usize> {
        match self {
            TemplateError::DynamicTagName { slot } => Some(*slot),
            _ => None,
        }
    }

    /// Format the error against the template it came from using ariadne
    pub fn report(&self, strings: &TemplateStrings, filename: &str) -> String {
        let source = strings.source();
        let span: Span = match self.slot() {
            Some(slot) if slot + 1 < strings.len() => strings.slot_span(slot),
            _ => 0..source.len(),
        };
        let message = self.to_string();

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(message.clone())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source.as_str())), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TemplateError::UnsupportedDirectivePosition {
            directive: "repeat",
            reason: "can only be used in child bindings",
        };
        assert_eq!(err.to_string(), "repeat() can only be used in child bindings");
        assert_eq!(
            TemplateError::NonStringValue {
                directive: "unsafe_html"
            }
            .to_string(),
            "unsafe_html() called with a non-string value"
        );
    }

    #[test]
    fn test_report_mentions_message_and_file() {
        let strings = TemplateStrings::intern(["<", "></div>"]);
        let report = TemplateError::DynamicTagName { slot: 0 }.report(&strings, "card.weft");
        assert!(report.contains("bindings in tag names"));
        assert!(report.contains("card.weft"));
    }
}
