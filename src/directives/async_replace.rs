//! `async_replace`: commit values pushed by outside code

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::directive::{DirectiveCall, DirectiveResult, Site};
use crate::value::Value;

/// Bindings only ever read the newest value, so that is all a queue keeps
#[derive(Debug, Default)]
struct Queue {
    latest: Option<Value>,
    /// Values pushed over the producer's lifetime
    pushed: usize,
    closed: bool,
}

/// A value source fed from outside the render cycle.
///
/// Clones share one queue. Values are delivered by
/// [`Renderer::flush`](crate::Renderer::flush); a flush commits only the
/// newest value not yet seen by the binding.
#[derive(Clone, Default)]
pub struct Producer {
    queue: Rc<RefCell<Queue>>,
}

impl Producer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value. Ignored once the producer is closed.
    pub fn push(&self, value: impl Into<Value>) {
        let mut queue = self.queue.borrow_mut();
        if !queue.closed {
            queue.latest = Some(value.into());
            queue.pushed += 1;
        }
    }

    /// Stop accepting values
    pub fn close(&self) {
        self.queue.borrow_mut().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.queue.borrow().closed
    }

    /// Number of values pushed so far
    pub fn len(&self) -> usize {
        self.queue.borrow().pushed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same underlying queue
    pub fn ptr_eq(&self, other: &Producer) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }

    fn latest(&self) -> Option<Value> {
        self.queue.borrow().latest.clone()
    }

    #[cfg(test)]
    fn retained(&self) -> usize {
        usize::from(self.queue.borrow().latest.is_some())
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.queue.borrow();
        f.debug_struct("Producer")
            .field("pushed", &queue.pushed)
            .field("closed", &queue.closed)
            .finish()
    }
}

type Mapper = Rc<dyn Fn(Value, usize) -> Value>;

#[derive(Clone)]
pub(crate) struct AsyncReplaceArgs {
    producer: Producer,
    mapper: Option<Mapper>,
}

#[derive(Default)]
pub(crate) struct AsyncReplaceState {
    producer: Option<Producer>,
    /// Index of the first value not yet delivered
    cursor: usize,
    mapper: Option<Mapper>,
}

impl AsyncReplaceState {
    pub(crate) fn has_pending(&self) -> bool {
        self.producer
            .as_ref()
            .map_or(false, |producer| producer.len() > self.cursor)
    }

    /// Newest undelivered value, mapped; older undelivered values are skipped
    pub(crate) fn take_latest(&mut self) -> Option<Value> {
        let producer = self.producer.as_ref()?;
        let len = producer.len();
        if len <= self.cursor {
            return None;
        }
        let index = len - 1;
        let value = producer.latest()?;
        if index > self.cursor {
            trace!(skipped = index - self.cursor, "coalesced producer values");
        }
        self.cursor = len;
        Some(match &self.mapper {
            Some(mapper) => mapper(value, index),
            None => value,
        })
    }
}

/// Render the values of `producer` as they arrive
pub fn async_replace(producer: &Producer) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::AsyncReplace(AsyncReplaceArgs {
        producer: producer.clone(),
        mapper: None,
    }))
}

/// [`async_replace`] with each value passed through `mapper` along with its
/// index in the producer
pub fn async_replace_with(
    producer: &Producer,
    mapper: impl Fn(Value, usize) -> Value + 'static,
) -> DirectiveResult {
    DirectiveResult::new(DirectiveCall::AsyncReplace(AsyncReplaceArgs {
        producer: producer.clone(),
        mapper: Some(Rc::new(mapper)),
    }))
}

/// Bind to the producer. Rendering never commits anything itself.
pub(crate) fn update(site: Site, state: &mut AsyncReplaceState, args: AsyncReplaceArgs) -> Value {
    if let Some(current) = &state.producer {
        if current.ptr_eq(&args.producer) {
            return Value::NoChange;
        }
        let dropped = current.len().saturating_sub(state.cursor);
        if dropped > 0 {
            trace!(directive = %site.directive, dropped, "dropping values of replaced producer");
        }
    }
    state.producer = Some(args.producer);
    state.cursor = 0;
    state.mapper = args.mapper;
    Value::NoChange
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_latest_coalesces() {
        let producer = Producer::new();
        let mut state = AsyncReplaceState {
            producer: Some(producer.clone()),
            ..Default::default()
        };
        assert!(!state.has_pending());

        producer.push("a");
        producer.push("b");
        assert!(state.has_pending());
        assert!(state.take_latest().unwrap().same_value(&Value::from("b")));
        assert!(state.take_latest().is_none());
    }

    #[test]
    fn test_mapper_sees_index() {
        let producer = Producer::new();
        let mut state = AsyncReplaceState {
            producer: Some(producer.clone()),
            mapper: Some(Rc::new(|value: Value, index: usize| {
                Value::from(format!("{}#{}", value.to_text(), index))
            })),
            ..Default::default()
        };
        producer.push("x");
        assert!(state.take_latest().unwrap().same_value(&Value::from("x#0")));
    }

    #[test]
    fn test_delivered_values_are_not_retained() {
        let producer = Producer::new();
        let mut state = AsyncReplaceState {
            producer: Some(producer.clone()),
            ..Default::default()
        };
        for n in 0..4 {
            producer.push(n);
            assert!(state.take_latest().unwrap().same_value(&Value::from(n)));
        }
        assert_eq!(producer.len(), 4);
        assert_eq!(producer.retained(), 1);
    }

    #[test]
    fn test_closed_producer_ignores_pushes() {
        let producer = Producer::new();
        producer.push(1);
        producer.close();
        producer.push(2);
        assert_eq!(producer.len(), 1);
        assert!(producer.is_closed());
    }
}
