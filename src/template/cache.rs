//! Compiled templates keyed by fragment-sequence identity

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::build::Template;
use crate::compiler::Markers;
use crate::error::TemplateError;
use crate::host::Host;
use crate::strings::StringsId;
use crate::value::{ResultKind, TemplateResult};

/// Append-only store of compiled templates.
///
/// One cache belongs to one renderer. Entries are never evicted: a call site
/// compiles once for the lifetime of its renderer.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: HashMap<(StringsId, ResultKind), Rc<Template>>,
}

impl TemplateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the template compiled for `id` and `kind`
    pub fn get(&self, id: StringsId, kind: ResultKind) -> Option<&Rc<Template>> {
        self.templates.get(&(id, kind))
    }

    pub fn contains(&self, id: StringsId, kind: ResultKind) -> bool {
        self.templates.contains_key(&(id, kind))
    }

    /// Number of compiled templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Return the cached template for `result`, compiling it on a miss
    pub fn get_or_build(
        &mut self,
        host: &mut dyn Host,
        result: &TemplateResult,
        markers: &Markers,
        dev_mode: bool,
    ) -> Result<Rc<Template>, TemplateError> {
        let key = (result.strings().id(), result.kind());
        if let Some(template) = self.templates.get(&key) {
            return Ok(Rc::clone(template));
        }

        debug!(id = ?key.0, kind = ?key.1, "template cache miss");
        let template = Rc::new(Template::build(host, result, markers, dev_mode)?);
        self.templates.insert(key, Rc::clone(&template));
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    fn greeting(name: &str) -> TemplateResult {
        crate::html!("<p>Hello ", "</p>"; name)
    }

    #[test]
    fn test_same_call_site_compiles_once() {
        let mut host = MemoryHost::new();
        let mut cache = TemplateCache::new();
        let markers = Markers::from_seed(0);

        let first = cache.get_or_build(&mut host, &greeting("a"), &markers, true).unwrap();
        let second = cache.get_or_build(&mut host, &greeting("b"), &markers, true).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kind_is_part_of_the_key() {
        let mut host = MemoryHost::new();
        let mut cache = TemplateCache::new();
        let markers = Markers::from_seed(0);
        let strings = crate::TemplateStrings::intern(["<g>", "</g>"]);

        let html = TemplateResult::new(strings.clone(), ResultKind::Html, vec![1.into()]);
        let svg = TemplateResult::new(strings, ResultKind::Svg, vec![1.into()]);
        cache.get_or_build(&mut host, &html, &markers, true).unwrap();
        cache.get_or_build(&mut host, &svg, &markers, true).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(html.strings().id(), ResultKind::Svg));
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let mut host = MemoryHost::new();
        let mut cache = TemplateCache::new();
        let bad = TemplateResult::new(
            crate::TemplateStrings::intern(["<", "></x>"]),
            ResultKind::Html,
            vec![1.into()],
        );
        assert!(cache
            .get_or_build(&mut host, &bad, &Markers::from_seed(0), true)
            .is_err());
        assert!(cache.is_empty());
    }
}
