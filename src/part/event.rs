//! Event listener parts

use tracing::{trace, warn};

use crate::error::TemplateError;
use crate::host::{Host, NodeId};
use crate::runtime::{Entry, Key, Runtime};
use crate::value::{Listener, Value};

/// An `@name=${listener}` binding.
///
/// The host only ever sees the part's handle; the committed listener is
/// looked up at dispatch time, so swapping handlers never touches the host.
pub(crate) struct EventPart {
    pub(crate) element: NodeId,
    pub(crate) name: String,
    pub(crate) committed: Option<Listener>,
}

impl Runtime {
    pub(crate) fn new_event_part(&mut self, element: NodeId, name: &str, parent: Key) -> Key {
        self.insert(
            Entry::Event(EventPart {
                element,
                name: name.to_string(),
                committed: None,
            }),
            Some(parent),
        )
    }

    pub(crate) fn set_event_value(
        &mut self,
        host: &mut dyn Host,
        part: Key,
        value: Value,
        directive_parent: Key,
    ) -> Result<(), TemplateError> {
        let value = self.resolve_directive(host, part, value, directive_parent, Some(0))?;
        let next = match value {
            Value::NoChange => return Ok(()),
            Value::Nothing => None,
            Value::Listener(listener) => Some(listener),
            other => {
                warn!(%part, value = ?other, "event binding expects a listener; treating as absent");
                None
            }
        };

        let event = self.event_mut(part)?;
        let (element, name) = (event.element, event.name.clone());
        let previous = event.committed.take();

        let remove = match (&previous, &next) {
            (Some(_), None) => true,
            (Some(previous), Some(next)) => previous.options() != next.options(),
            (None, _) => false,
        };
        let add = next.is_some() && (previous.is_none() || remove);

        let handle = part.to_handle();
        if let (true, Some(previous)) = (remove, &previous) {
            host.remove_event_listener(element, &name, handle, previous.options());
        }
        if let (true, Some(next)) = (add, &next) {
            host.add_event_listener(element, &name, handle, next.options());
        }
        trace!(%part, name = %name, remove, add, "committed listener");

        self.event_mut(part)?.committed = next;
        Ok(())
    }

    /// Listener currently committed to the event part behind `part`
    pub(crate) fn committed_listener(&self, part: Key) -> Option<Listener> {
        self.event(part).ok().and_then(|event| event.committed.clone())
    }
}
