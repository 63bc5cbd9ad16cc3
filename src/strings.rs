//! Fragment sequences and their call-site identity
//!
//! A compiled template is cached by the *identity* of its fragment sequence,
//! never by its text. The [`html!`](crate::html), [`svg!`](crate::svg) and
//! [`mathml!`](crate::mathml) macros declare one `static` per call site, so
//! every evaluation of the same call site yields the same [`StringsId`].
//!
//! Fragment sequences built at runtime (template source files, `unsafe_html`)
//! have no call site. They go through a process-wide interner keyed by their
//! full content: two runtime sequences with identical fragments share one
//! identity, and therefore one compiled template and, when committed to the
//! same part, one instance. That sharing is the only collision the fallback
//! introduces.
//!
//! Sequences that arrive through deserialization are marked untrusted and are
//! refused by the compiler.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer};

/// Identity of a fragment sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringsId(usize);

/// Backing storage for a macro call site. Not meant to be built by hand.
#[doc(hidden)]
#[derive(Debug)]
pub struct StaticStrings {
    fragments: &'static [&'static str],
}

impl StaticStrings {
    #[doc(hidden)]
    pub const fn new(fragments: &'static [&'static str]) -> Self {
        Self { fragments }
    }
}

#[derive(Debug)]
struct InternedStrings {
    fragments: Vec<Arc<str>>,
}

/// Global interner for runtime-built sequences (thread-safe, append-only)
static INTERNER: Lazy<DashMap<Vec<String>, Arc<InternedStrings>>> = Lazy::new(DashMap::new);

#[derive(Clone)]
enum Repr {
    Static(&'static StaticStrings),
    Interned(Arc<InternedStrings>),
    Untrusted(Arc<[String]>),
}

/// Ordered literal fragments surrounding the dynamic slots of a template
#[derive(Clone)]
pub struct TemplateStrings {
    repr: Repr,
}

impl TemplateStrings {
    /// Wrap a macro call site's static storage
    pub fn from_static(strings: &'static StaticStrings) -> Self {
        Self {
            repr: Repr::Static(strings),
        }
    }

    /// Intern a runtime-built fragment sequence.
    ///
    /// Equal content always maps to the same identity.
    pub fn intern<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key: Vec<String> = fragments.into_iter().map(Into::into).collect();
        if let Some(existing) = INTERNER.get(&key) {
            return Self {
                repr: Repr::Interned(Arc::clone(existing.value())),
            };
        }

        let interned = Arc::new(InternedStrings {
            fragments: key.iter().map(|s| Arc::from(s.as_str())).collect(),
        });
        // Another thread may have won the race; the entry API keeps the first.
        let entry = Arc::clone(INTERNER.entry(key).or_insert(interned).value());
        Self {
            repr: Repr::Interned(entry),
        }
    }

    /// A sequence of unknown origin. The compiler refuses it.
    pub fn untrusted<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repr: Repr::Untrusted(fragments.into_iter().map(Into::into).collect()),
        }
    }

    /// Identity of this sequence
    pub fn id(&self) -> StringsId {
        StringsId(match &self.repr {
            Repr::Static(s) => *s as *const StaticStrings as usize,
            Repr::Interned(s) => Arc::as_ptr(s) as usize,
            Repr::Untrusted(s) => Arc::as_ptr(s) as *const String as usize,
        })
    }

    /// Whether the sequence came from a macro call site or the interner
    pub fn is_trusted(&self) -> bool {
        !matches!(self.repr, Repr::Untrusted(_))
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Static(s) => s.fragments.len(),
            Repr::Interned(s) => s.fragments.len(),
            Repr::Untrusted(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fragment at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        match &self.repr {
            Repr::Static(s) => s.fragments.get(index).copied(),
            Repr::Interned(s) => s.fragments.get(index).map(|f| &**f),
            Repr::Untrusted(s) => s.get(index).map(String::as_str),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// The fragments joined with `${…}` placeholders, for diagnostics
    pub fn source(&self) -> String {
        self.iter().collect::<Vec<_>>().join("${…}")
    }

    /// Byte range of slot `index`'s placeholder inside [`Self::source`]
    pub fn slot_span(&self, index: usize) -> std::ops::Range<usize> {
        let placeholder = "${…}".len();
        let start: usize = self
            .iter()
            .take(index + 1)
            .map(str::len)
            .sum::<usize>()
            + index * placeholder;
        start..start + placeholder
    }
}

impl PartialEq for TemplateStrings {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TemplateStrings {}

impl fmt::Debug for TemplateStrings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateStrings")
            .field("id", &self.id())
            .field("trusted", &self.is_trusted())
            .field("fragments", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<'de> Deserialize<'de> for TemplateStrings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fragments = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::untrusted(fragments))
    }
}

/// Build an HTML [`TemplateResult`](crate::TemplateResult) bound to this call site.
///
/// ```rust
/// use weft::html;
///
/// let name = "world";
/// let result = html!("<p>Hello ", "!</p>"; name);
/// assert_eq!(result.values().len(), 1);
/// ```
#[macro_export]
macro_rules! html {
    ($($fragment:literal),+ $(; $($value:expr),* $(,)?)?) => {{
        static STRINGS: $crate::StaticStrings = $crate::StaticStrings::new(&[$($fragment),+]);
        $crate::TemplateResult::new(
            $crate::TemplateStrings::from_static(&STRINGS),
            $crate::ResultKind::Html,
            ::std::vec![$($($crate::Value::from($value)),*)?],
        )
    }};
}

/// Build an SVG [`TemplateResult`](crate::TemplateResult) bound to this call site.
#[macro_export]
macro_rules! svg {
    ($($fragment:literal),+ $(; $($value:expr),* $(,)?)?) => {{
        static STRINGS: $crate::StaticStrings = $crate::StaticStrings::new(&[$($fragment),+]);
        $crate::TemplateResult::new(
            $crate::TemplateStrings::from_static(&STRINGS),
            $crate::ResultKind::Svg,
            ::std::vec![$($($crate::Value::from($value)),*)?],
        )
    }};
}

/// Build a MathML [`TemplateResult`](crate::TemplateResult) bound to this call site.
#[macro_export]
macro_rules! mathml {
    ($($fragment:literal),+ $(; $($value:expr),* $(,)?)?) => {{
        static STRINGS: $crate::StaticStrings = $crate::StaticStrings::new(&[$($fragment),+]);
        $crate::TemplateResult::new(
            $crate::TemplateStrings::from_static(&STRINGS),
            $crate::ResultKind::MathMl,
            ::std::vec![$($($crate::Value::from($value)),*)?],
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_site() -> TemplateStrings {
        crate::html!("<p>", "</p>"; 1).strings().clone()
    }

    #[test]
    fn test_same_call_site_same_identity() {
        assert_eq!(call_site().id(), call_site().id());
    }

    #[test]
    fn test_identical_text_different_call_sites() {
        let a = crate::html!("<p>", "</p>"; 1);
        let b = crate::html!("<p>", "</p>"; 1);
        assert_ne!(a.strings().id(), b.strings().id());
    }

    #[test]
    fn test_interned_content_shares_identity() {
        let a = TemplateStrings::intern(["<b>", "</b>"]);
        let b = TemplateStrings::intern(vec!["<b>".to_string(), "</b>".to_string()]);
        assert_eq!(a.id(), b.id());
        assert!(a.is_trusted());
    }

    #[test]
    fn test_deserialized_strings_are_untrusted() {
        let strings: TemplateStrings = toml::from_str::<Wrapper>("fragments = [\"<p>\", \"</p>\"]")
            .unwrap()
            .fragments;
        assert!(!strings.is_trusted());
        assert_eq!(strings.len(), 2);
    }

    #[derive(serde::Deserialize)]
    struct Wrapper {
        fragments: TemplateStrings,
    }

    #[test]
    fn test_slot_span_points_at_placeholder() {
        let strings = TemplateStrings::intern(["<a>", "-", "</a>"]);
        let source = strings.source();
        assert_eq!(&source[strings.slot_span(1)], "${…}");
        assert_eq!(&source[..strings.slot_span(0).start], "<a>");
    }
}
