//! Marker compiler
//!
//! Turns a fragment sequence into one markup string in which every slot is
//! replaced by a marker the template builder can find again after parsing:
//!
//! - a slot in text content becomes a processing-instruction-like anchor,
//!   `<?lit$…$>`, which markup parsers turn into a comment;
//! - a slot inside an attribute value renames the attribute to
//!   `name$lit$` and puts the marker in the value; the original name is
//!   recorded in [`CompiledMarkup::attribute_names`] since hosts may change
//!   its case;
//! - a slot in element position becomes a bare attribute `lit$…$<slot>`;
//! - slots in comments and raw-text elements are kept as plain marker text.
//!
//! The scan is a small state machine driven across fragment boundaries.

mod marker;

pub use marker::{Markers, BOUND_ATTRIBUTE_SUFFIX, MARKER_PREFIX};

use tracing::trace;

use crate::error::TemplateError;
use crate::host::markup::is_raw_text_element;
use crate::strings::TemplateStrings;
use crate::value::ResultKind;

/// Output of [`compile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMarkup {
    /// Markup with every slot replaced by a marker
    pub html: String,
    /// Original names of bound attributes, in source order
    pub attribute_names: Vec<String>,
}

/// Where the scanner is, carried across fragment boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Text,
    Tag,
    Comment,
    BogusComment,
    DoubleQuoted,
    SingleQuoted,
    RawText(String),
}

/// Where the attribute name ends in the current fragment, if a slot is an
/// attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeEnd {
    None,
    /// Whitespace at the very end of a tag: element position
    Bare,
    At(usize),
}

/// What `find_text_end` stopped on
#[derive(Debug)]
enum TextEnd<'s> {
    CommentOpen,
    BogusOpen,
    Tag(&'s str),
    DynamicTag,
}

/// What `find_tag_end` stopped on
#[derive(Debug)]
enum TagEnd<'s> {
    Close,
    Bare,
    Attribute {
        name: &'s str,
        name_end: usize,
        quote: Option<char>,
    },
}

/// Compile `strings` into marker-annotated markup.
///
/// Slot `i` sits between `strings[i]` and `strings[i + 1]`. SVG and MathML
/// results are wrapped in their root element so the host parses them in the
/// right namespace; the template builder unwraps it again.
pub fn compile(
    strings: &TemplateStrings,
    kind: ResultKind,
    markers: &Markers,
) -> Result<CompiledMarkup, TemplateError> {
    let fragments: Vec<&str> = strings.iter().collect();
    let slots = fragments.len().saturating_sub(1);
    let marker = markers.marker();

    let mut html = String::new();
    let mut attribute_names = Vec::new();
    let mut state = ScanState::Text;
    let mut pending_raw_text: Option<String> = None;

    html.push_str(match kind {
        ResultKind::Svg => "<svg>",
        ResultKind::MathMl => "<math>",
        ResultKind::Html => "",
    });

    for (i, s) in fragments.iter().take(slots).enumerate() {
        let mut attribute_end = AttributeEnd::None;
        let mut attribute_name: Option<&str> = None;
        let mut last = 0;

        while last < s.len() {
            match &state {
                ScanState::Text => {
                    let Some((end, found)) = find_text_end(s, last) else {
                        break;
                    };
                    last = end;
                    state = match found {
                        TextEnd::CommentOpen => ScanState::Comment,
                        TextEnd::BogusOpen => ScanState::BogusComment,
                        TextEnd::Tag(name) => {
                            if is_raw_text_element(name) {
                                pending_raw_text = Some(name.to_string());
                            }
                            ScanState::Tag
                        }
                        TextEnd::DynamicTag => {
                            return Err(TemplateError::DynamicTagName { slot: i });
                        }
                    };
                }
                ScanState::Tag => {
                    let Some((end, found)) = find_tag_end(s, last) else {
                        break;
                    };
                    last = end;
                    match found {
                        TagEnd::Close => {
                            state = match pending_raw_text.take() {
                                Some(name) => ScanState::RawText(name),
                                None => ScanState::Text,
                            };
                            attribute_end = AttributeEnd::None;
                        }
                        TagEnd::Bare => attribute_end = AttributeEnd::Bare,
                        TagEnd::Attribute {
                            name,
                            name_end,
                            quote,
                        } => {
                            attribute_end = AttributeEnd::At(name_end);
                            attribute_name = Some(name);
                            state = match quote {
                                Some('"') => ScanState::DoubleQuoted,
                                Some(_) => ScanState::SingleQuoted,
                                None => ScanState::Tag,
                            };
                        }
                    }
                }
                ScanState::Comment => match s[last..].find("-->") {
                    Some(p) => {
                        last += p + 3;
                        state = ScanState::Text;
                    }
                    None => break,
                },
                ScanState::BogusComment => match s[last..].find('>') {
                    Some(p) => {
                        last += p + 1;
                        state = ScanState::Text;
                    }
                    None => break,
                },
                ScanState::DoubleQuoted | ScanState::SingleQuoted => {
                    let quote = if state == ScanState::DoubleQuoted {
                        '"'
                    } else {
                        '\''
                    };
                    match s[last..].find(quote) {
                        Some(p) => {
                            last += p + 1;
                            state = ScanState::Tag;
                        }
                        None => break,
                    }
                }
                ScanState::RawText(name) => {
                    let close = format!("</{}", name);
                    match s[last..].find(&close) {
                        Some(p) => {
                            last += p + close.len();
                            state = ScanState::Tag;
                        }
                        None => break,
                    }
                }
            }
        }

        // A self-closing tag right after an unquoted value needs a separator
        let self_closes = fragments
            .get(i + 1)
            .map_or(false, |next| next.starts_with("/>"));
        let end = if state == ScanState::Tag && self_closes {
            " "
        } else {
            ""
        };

        if state == ScanState::Text {
            html.push_str(s);
            html.push_str(markers.node_marker());
        } else if let (AttributeEnd::At(name_end), Some(name)) = (attribute_end, attribute_name) {
            attribute_names.push(name.to_string());
            html.push_str(&s[..name_end]);
            html.push_str(BOUND_ATTRIBUTE_SUFFIX);
            html.push_str(&s[name_end..]);
            html.push_str(marker);
            html.push_str(end);
        } else {
            html.push_str(s);
            html.push_str(marker);
            if attribute_end == AttributeEnd::Bare {
                html.push_str(&i.to_string());
            } else {
                html.push_str(end);
            }
        }
        trace!(slot = i, state = ?state, "placed marker");
    }

    // An empty tail still needs a node so the last child part has an end
    match fragments.last() {
        Some(tail) if !tail.is_empty() => html.push_str(tail),
        _ => html.push_str("<?>"),
    }
    html.push_str(match kind {
        ResultKind::Svg => "</svg>",
        ResultKind::MathMl => "</math>",
        ResultKind::Html => "",
    });

    Ok(CompiledMarkup {
        html,
        attribute_names,
    })
}

/// Find the next construct that leaves text content: a comment opener, a
/// bogus comment (`</` followed by a non-letter), a tag name, or a `<` at
/// the very end of the fragment where a tag name would come from a slot.
fn find_text_end(s: &str, from: usize) -> Option<(usize, TextEnd<'_>)> {
    let mut search = from;
    while let Some(offset) = s[search..].find('<') {
        let lt = search + offset;
        let rest = &s[lt + 1..];

        if rest.starts_with("!--") {
            return Some((lt + 4, TextEnd::CommentOpen));
        }
        if let Some(after_slash) = rest.strip_prefix('/') {
            if let Some(c) = after_slash.chars().next() {
                if !c.is_ascii_alphabetic() {
                    return Some((lt + 2 + c.len_utf8(), TextEnd::BogusOpen));
                }
            }
        }

        let name_start = if rest.starts_with('/') { 1 } else { 0 };
        let after = &rest[name_start..];
        match after.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => {
                let name_len = after
                    .find(|c: char| c == '>' || c.is_whitespace())
                    .unwrap_or(after.len());
                let name = &rest[..name_start + name_len];
                return Some((lt + 1 + name.len(), TextEnd::Tag(name)));
            }
            None => return Some((s.len(), TextEnd::DynamicTag)),
            Some(_) => search = lt + 1,
        }
    }
    None
}

fn is_html_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{c}' | '\r')
}

/// Find the next construct inside a start tag: its closing `>`, an
/// attribute name (with `=` and an opening quote when present), or
/// whitespace at the very end of the fragment.
fn find_tag_end(s: &str, from: usize) -> Option<(usize, TagEnd<'_>)> {
    for (p, c) in s[from..].char_indices().map(|(p, c)| (from + p, c)) {
        if c == '>' {
            return Some((p + 1, TagEnd::Close));
        }
        if !is_html_space(c) {
            continue;
        }

        let name_start = p + 1;
        let name_len = s[name_start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '=' | '/'))
            .unwrap_or(s.len() - name_start);
        if name_len == 0 {
            if name_start == s.len() {
                return Some((s.len(), TagEnd::Bare));
            }
            continue;
        }

        let name_end = name_start + name_len;
        let Some((end, quote)) = scan_equals(s, name_end) else {
            continue;
        };
        return Some((
            end,
            TagEnd::Attribute {
                name: &s[name_start..name_end],
                name_end,
                quote,
            },
        ));
    }
    None
}

/// Match `\s*=\s*` plus one unquoted value character or an opening quote.
fn scan_equals(s: &str, from: usize) -> Option<(usize, Option<char>)> {
    let skip = |at: usize| {
        at + s[at..]
            .find(|c: char| !is_html_space(c))
            .unwrap_or(s.len() - at)
    };
    let eq = skip(from);
    if !s[eq..].starts_with('=') {
        return None;
    }
    let value = skip(eq + 1);
    match s[value..].chars().next() {
        Some(q @ ('"' | '\'')) => Some((value + 1, Some(q))),
        Some(c) if !is_html_space(c) && !matches!(c, '`' | '<' | '>' | '=') => {
            Some((value + c.len_utf8(), None))
        }
        _ => Some((value, None)),
    }
}
