//! `guard`: skip re-rendering until dependencies change

use std::rc::Rc;

use crate::directive::{DirectiveCall, DirectiveResult};
use crate::value::Value;

#[derive(Clone)]
pub(crate) struct GuardArgs {
    deps: Box<Value>,
    render: Rc<dyn Fn() -> Value>,
}

#[derive(Default)]
pub(crate) struct GuardState {
    previous: Option<Value>,
}

/// Evaluate `render` only when `deps` changed since the last render.
///
/// A list of dependencies is compared element-wise; anything else is
/// compared as a single value. Comparison is strict equality, so only
/// primitives, nodes and listeners can ever match.
pub fn guard<V: Into<Value>>(deps: impl Into<Value>, render: impl Fn() -> V + 'static) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::Guard(GuardArgs {
        deps: Box::new(deps.into()),
        render: Rc::new(move || render().into()),
    }))
}

fn unchanged(previous: &Value, deps: &Value) -> bool {
    match (previous, deps) {
        (Value::List(previous), Value::List(deps)) => {
            previous.len() == deps.len() && previous.iter().zip(deps).all(|(a, b)| a.same_value(b))
        }
        (Value::List(_), _) | (_, Value::List(_)) => false,
        (previous, deps) => previous.same_value(deps),
    }
}

pub(crate) fn update(state: &mut GuardState, args: GuardArgs) -> Value {
    if let Some(previous) = &state.previous {
        if unchanged(previous, &args.deps) {
            return Value::NoChange;
        }
    }
    state.previous = Some(*args.deps);
    (args.render)()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn args(deps: impl Into<Value>, calls: &Rc<Cell<usize>>) -> GuardArgs {
        let calls = Rc::clone(calls);
        GuardArgs {
            deps: Box::new(deps.into()),
            render: Rc::new(move || {
                calls.set(calls.get() + 1);
                Value::from("rendered")
            }),
        }
    }

    #[test]
    fn test_reruns_only_on_change() {
        let calls = Rc::new(Cell::new(0));
        let mut state = GuardState::default();

        update(&mut state, args(vec![1, 2], &calls));
        assert!(matches!(update(&mut state, args(vec![1, 2], &calls)), Value::NoChange));
        assert_eq!(calls.get(), 1);

        update(&mut state, args(vec![1, 3], &calls));
        update(&mut state, args(vec![1, 3, 4], &calls));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_scalar_deps() {
        let calls = Rc::new(Cell::new(0));
        let mut state = GuardState::default();
        update(&mut state, args("a", &calls));
        update(&mut state, args("a", &calls));
        update(&mut state, args(vec!["a"], &calls));
        assert_eq!(calls.get(), 2);
    }
}
