//! Minimal markup reader for [`MemoryHost`](super::MemoryHost)
//!
//! Text and comments are scanned by hand; the inside of a start tag is lexed
//! with logos. Raw-text elements (`script`, `style`, `textarea`, `title`) keep
//! their content verbatim up to the matching end tag. Tree construction, void
//! elements and foreign content are handled by the builder in `memory.rs`.

use std::borrow::Cow;

use logos::Logos;

/// Elements whose content is character data, never markup
pub(crate) const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

pub(crate) fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

/// Tokens inside a start tag, after the tag name
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
enum TagToken<'s> {
    #[token(">")]
    End,
    #[token("/")]
    Slash,
    #[token("=")]
    Equals,
    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'[^']*'"#, |lex| unquote(lex.slice()))]
    Quoted(&'s str),
    #[regex(r#"[^ \t\n\r\f"'>/=]+"#, |lex| lex.slice())]
    Word(&'s str),
}

fn unquote(s: &str) -> &str {
    &s[1..s.len() - 1]
}

/// One markup event, in source order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    Text(String),
    Comment(String),
}

/// Split `src` into markup events.
pub(crate) fn tokenize(src: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(offset) = src[pos..].find('<') {
        let lt = pos + offset;
        let rest = &src[lt..];
        let after = rest[1..].chars().next();

        let (event, next) = if rest.starts_with("<!--") {
            let body = lt + 4;
            match src[body..].find("-->") {
                Some(end) => (Event::Comment(src[body..body + end].to_string()), body + end + 3),
                None => (Event::Comment(src[body..].to_string()), src.len()),
            }
        } else if rest.starts_with("<?") {
            bogus_comment(src, lt + 1)
        } else if rest.starts_with("<!") {
            bogus_comment(src, lt + 2)
        } else if rest.starts_with("</") {
            match rest[2..].chars().next() {
                Some(c) if c.is_ascii_alphabetic() => {
                    let name_start = lt + 2;
                    let name_end = scan_name(src, name_start);
                    let close = src[name_end..]
                        .find('>')
                        .map(|i| name_end + i + 1)
                        .unwrap_or(src.len());
                    (Event::Close(src[name_start..name_end].to_string()), close)
                }
                Some('>') => {
                    flush_text(src, text_start, lt, &mut events);
                    pos = lt + 3;
                    text_start = pos;
                    continue;
                }
                Some(_) => bogus_comment(src, lt + 2),
                None => break,
            }
        } else if after.is_some_and(|c| c.is_ascii_alphabetic()) {
            let name_start = lt + 1;
            let name_end = scan_name(src, name_start);
            let name = src[name_start..name_end].to_string();
            let (attributes, self_closing, end) = read_attributes(src, name_end);
            let raw = is_raw_text_element(&name);
            flush_text(src, text_start, lt, &mut events);
            events.push(Event::Open {
                name: name.clone(),
                attributes,
                self_closing,
            });
            pos = end;
            if raw {
                let close = find_raw_text_end(src, pos, &name);
                if close > pos {
                    events.push(Event::Text(src[pos..close].to_string()));
                }
                pos = close;
            }
            text_start = pos;
            continue;
        } else {
            // A lone '<' is text.
            pos = lt + 1;
            continue;
        };

        flush_text(src, text_start, lt, &mut events);
        events.push(event);
        pos = next;
        text_start = pos;
    }

    flush_text(src, text_start, src.len(), &mut events);
    events
}

fn flush_text(src: &str, start: usize, end: usize, events: &mut Vec<Event>) {
    if end > start {
        events.push(Event::Text(decode_entities(&src[start..end]).into_owned()));
    }
}

fn bogus_comment(src: &str, body: usize) -> (Event, usize) {
    match src[body..].find('>') {
        Some(end) => (Event::Comment(src[body..body + end].to_string()), body + end + 1),
        None => (Event::Comment(src[body..].to_string()), src.len()),
    }
}

fn scan_name(src: &str, start: usize) -> usize {
    src[start..]
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .map(|i| start + i)
        .unwrap_or(src.len())
}

fn find_raw_text_end(src: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{}", name.to_ascii_lowercase());
    let haystack = src[from..].to_ascii_lowercase();
    haystack
        .find(&needle)
        .map(|i| from + i)
        .unwrap_or(src.len())
}

/// Lex attributes from `start` up to and including the closing `>`.
///
/// Returns the attributes in source order, whether the tag ended with `/>`,
/// and the byte offset just past the tag.
fn read_attributes(src: &str, start: usize) -> (Vec<(String, String)>, bool, usize) {
    let mut attributes = Vec::new();
    let mut pending: Option<String> = None;
    let mut awaiting_value = false;
    let mut slash_before_end = false;
    let mut base = start;
    let mut lexer = TagToken::lexer(&src[base..]);

    loop {
        let Some(token) = lexer.next() else {
            if let Some(name) = pending.take() {
                attributes.push((name, String::new()));
            }
            return (attributes, false, src.len());
        };
        let span = lexer.span();
        let self_closing = std::mem::take(&mut slash_before_end);

        match token {
            Ok(TagToken::End) => {
                if let Some(name) = pending.take() {
                    attributes.push((name, String::new()));
                }
                return (attributes, self_closing, base + span.end);
            }
            Ok(TagToken::Slash) => {
                if let Some(name) = pending.take() {
                    attributes.push((name, String::new()));
                }
                awaiting_value = false;
                slash_before_end = true;
            }
            Ok(TagToken::Equals) => {
                awaiting_value = pending.is_some();
            }
            Ok(TagToken::Quoted(value)) => {
                if awaiting_value {
                    if let Some(name) = pending.take() {
                        attributes.push((name, decode_entities(value).into_owned()));
                    }
                    awaiting_value = false;
                }
            }
            Ok(TagToken::Word(word)) => {
                if awaiting_value {
                    // Unquoted values run to the next whitespace or '>', and may
                    // contain characters the tag lexer splits on.
                    let value_start = base + span.start;
                    let value_end = src[value_start..]
                        .find(|c: char| c.is_ascii_whitespace() || c == '>')
                        .map(|i| value_start + i)
                        .unwrap_or(src.len());
                    if let Some(name) = pending.take() {
                        let value = &src[value_start..value_end];
                        attributes.push((name, decode_entities(value).into_owned()));
                    }
                    awaiting_value = false;
                    base = value_end;
                    lexer = TagToken::lexer(&src[base..]);
                } else {
                    if let Some(name) = pending.take() {
                        attributes.push((name, String::new()));
                    }
                    pending = Some(word.to_string());
                }
            }
            Err(()) => {
                // Unterminated quote: the rest of the input belongs to the tag.
                if let Some(name) = pending.take() {
                    attributes.push((name, String::new()));
                }
                return (attributes, false, src.len());
            }
        }
    }
}

/// Decode the handful of character references the serializer produces.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|num| match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

pub(crate) fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

pub(crate) fn escape_attribute(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '"']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace('&', "&amp;").replace('"', "&quot;"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(name: &str, attributes: &[(&str, &str)], self_closing: bool) -> Event {
        Event::Open {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            self_closing,
        }
    }

    #[test]
    fn test_tokenize_elements_and_text() {
        let events = tokenize("<p class=\"a\">hi &amp; bye</p>");
        assert_eq!(
            events,
            vec![
                open("p", &[("class", "a")], false),
                Event::Text("hi & bye".into()),
                Event::Close("p".into()),
            ]
        );
    }

    #[test]
    fn test_processing_instruction_becomes_comment() {
        let events = tokenize("a<?lit$x$>b");
        assert_eq!(
            events,
            vec![
                Event::Text("a".into()),
                Event::Comment("?lit$x$".into()),
                Event::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_unquoted_value_keeps_slash() {
        let events = tokenize("<a href=x/y>");
        assert_eq!(events, vec![open("a", &[("href", "x/y")], false)]);
    }

    #[test]
    fn test_bare_attribute_and_self_closing() {
        let events = tokenize("<input disabled />");
        assert_eq!(events, vec![open("input", &[("disabled", "")], true)]);
    }

    #[test]
    fn test_raw_text_keeps_markup_verbatim() {
        let events = tokenize("<script>if (a < b) {}</script>");
        assert_eq!(
            events,
            vec![
                open("script", &[], false),
                Event::Text("if (a < b) {}".into()),
                Event::Close("script".into()),
            ]
        );
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&bogus"), "AB&bogus");
    }
}
