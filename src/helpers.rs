//! Plain value helpers for building template values.
//!
//! None of these are directives; they only shape values before binding.

use crate::value::Value;

/// The value when present, otherwise [`Value::Nothing`] (which removes an
/// attribute)
pub fn if_defined<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Nothing)
}

/// Evaluate one of two branches
pub fn when<T, F>(condition: bool, then: impl FnOnce() -> T, otherwise: impl FnOnce() -> F) -> Value
where
    T: Into<Value>,
    F: Into<Value>,
{
    if condition {
        then().into()
    } else {
        otherwise().into()
    }
}

/// Map each item (with its index) to a value
pub fn map<I, V>(items: I, mut f: impl FnMut(I::Item, usize) -> V) -> Value
where
    I: IntoIterator,
    V: Into<Value>,
{
    Value::List(
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| f(item, index).into())
            .collect(),
    )
}

/// Interleave `separator` between items
pub fn join<I>(items: I, separator: impl Into<Value>) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let separator = separator.into();
    join_with(items, |_| separator.clone())
}

/// Interleave a separator built from its index (0 for the first gap)
pub fn join_with<I, S>(items: I, mut separator: impl FnMut(usize) -> S) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
    S: Into<Value>,
{
    let mut joined = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            joined.push(separator(index - 1).into());
        }
        joined.push(item.into());
    }
    Value::List(joined)
}

/// Integers from `start` towards `end` (exclusive) by `step`.
///
/// A zero step yields nothing; a negative step counts down.
pub fn range(start: i64, end: i64, step: i64) -> impl Iterator<Item = i64> {
    let mut next = start;
    std::iter::from_fn(move || {
        let more = match step {
            0 => false,
            s if s > 0 => next < end,
            _ => next > end,
        };
        if !more {
            return None;
        }
        let current = next;
        next = next.saturating_add(step);
        if next == current {
            next = end;
        }
        Some(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(value: Value) -> Vec<String> {
        match value {
            Value::List(items) => items.iter().map(Value::to_text).collect(),
            other => vec![other.to_text()],
        }
    }

    #[test]
    fn test_if_defined() {
        assert!(if_defined(None::<&str>).is_nothing());
        assert_eq!(if_defined(Some("x")).to_text(), "x");
    }

    #[test]
    fn test_when_evaluates_one_branch() {
        let value = when(false, || -> Value { panic!("not taken") }, || "no");
        assert_eq!(value.to_text(), "no");
    }

    #[test]
    fn test_map_and_join() {
        assert_eq!(texts(map(["a", "b"], |s, i| format!("{}{}", s, i))), vec!["a0", "b1"]);
        assert_eq!(texts(join(["a", "b", "c"], "|")), vec!["a", "|", "b", "|", "c"]);
        assert_eq!(texts(join_with(["a", "b", "c"], |i| i)), vec!["a", "0", "b", "1", "c"]);
        assert_eq!(texts(join(Vec::<&str>::new(), ",")), Vec::<String>::new());
    }

    #[test]
    fn test_range() {
        assert_eq!(range(0, 5, 2).collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(range(3, 0, -1).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(range(0, 3, 0).count(), 0);
        assert_eq!(range(0, 3, -1).count(), 0);
    }
}
