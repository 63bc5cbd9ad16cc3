//! `repeat`: keyed list rendering

use std::mem;

use tracing::debug;

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::error::TemplateError;
use crate::host::Host;
use crate::part::{PartInfo, PartType};
use crate::reconcile::{reconcile, ListOps};
use crate::runtime::{Committed, Key, Runtime};
use crate::value::{ItemKey, Value};

#[derive(Clone)]
pub(crate) struct RepeatArgs {
    keys: Vec<ItemKey>,
    values: Vec<Value>,
}

#[derive(Default)]
pub(crate) struct RepeatState {
    item_keys: Option<Vec<ItemKey>>,
}

/// Render `items` keyed by `key`, moving the DOM of each item along with it
/// when the order changes.
///
/// ```rust
/// use weft::{html, repeat};
///
/// let rows = vec![(1, "one"), (2, "two")];
/// let list = repeat(rows, |(id, _), _| *id, |(_, label), _| html!("<li>", "</li>"; *label));
/// ```
pub fn repeat<I, T, K, V>(
    items: I,
    key: impl Fn(&T, usize) -> K,
    template: impl Fn(&T, usize) -> V,
) -> DirectiveResult
where
    I: IntoIterator<Item = T>,
    K: Into<ItemKey>,
    V: Into<Value>,
{
    let mut keys = Vec::new();
    let mut values = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        keys.push(key(&item, index).into());
        values.push(template(&item, index).into());
    }
    DirectiveResult::new(DirectiveCall::Repeat(RepeatArgs { keys, values }))
}

/// [`repeat`] keyed by position
pub fn repeat_unkeyed<I, T, V>(items: I, template: impl Fn(&T, usize) -> V) -> DirectiveResult
where
    I: IntoIterator<Item = T>,
    V: Into<Value>,
{
    repeat(items, |_, index| index, template)
}

pub(crate) fn validate(info: &PartInfo) -> Result<(), TemplateError> {
    if info.ty != PartType::Child {
        return Err(TemplateError::UnsupportedDirectivePosition {
            directive: "repeat",
            reason: "can only be used in child bindings",
        });
    }
    Ok(())
}

pub(crate) fn update(
    rt: &mut Runtime,
    host: &mut dyn Host,
    site: Site,
    state: &mut RepeatState,
    args: RepeatArgs,
) -> Result<Value, TemplateError> {
    let old_parts = match &rt.child(site.part)?.committed {
        Committed::Items(parts) => parts.clone(),
        _ => {
            // first render, or the part held something else: plain list commit
            state.item_keys = Some(args.keys);
            return Ok(Value::List(args.values));
        }
    };
    let old_keys = state.item_keys.take().unwrap_or_default();

    let mut ops = RepeatOps {
        rt,
        host,
        container: site.part,
        values: args.values,
        created: 0,
        moved: 0,
        removed: 0,
    };
    let new_parts = reconcile(&old_parts, &old_keys, &args.keys, &mut ops)?;
    let (created, moved, removed) = (ops.created, ops.moved, ops.removed);

    debug!(
        part = %site.part,
        items = new_parts.len(),
        created,
        moved,
        removed,
        "reconciled keyed list"
    );
    rt.child_mut(site.part)?.committed = Committed::Items(new_parts);
    state.item_keys = Some(args.keys);
    Ok(Value::NoChange)
}

/// Item-part operations on one container
struct RepeatOps<'a> {
    rt: &'a mut Runtime,
    host: &'a mut dyn Host,
    container: Key,
    values: Vec<Value>,
    created: usize,
    moved: usize,
    removed: usize,
}

impl RepeatOps<'_> {
    fn value(&mut self, index: usize) -> Value {
        self.values.get_mut(index).map(mem::take).unwrap_or_default()
    }
}

impl ListOps<Key> for RepeatOps<'_> {
    type Error = TemplateError;

    fn update(&mut self, part: Key, index: usize) -> Result<(), TemplateError> {
        let value = self.value(index);
        self.rt.set_child_value(self.host, part, value, part)
    }

    fn create(&mut self, before: Option<Key>, index: usize) -> Result<Key, TemplateError> {
        let part = self.rt.insert_item_part(self.host, self.container, before, None)?;
        self.created += 1;
        self.update(part, index)?;
        Ok(part)
    }

    fn move_before(&mut self, part: Key, before: Option<Key>) -> Result<(), TemplateError> {
        self.rt.insert_item_part(self.host, self.container, before, Some(part))?;
        self.moved += 1;
        Ok(())
    }

    fn remove(&mut self, part: Key) -> Result<(), TemplateError> {
        self.removed += 1;
        self.rt.remove_item_part(self.host, part)
    }
}
