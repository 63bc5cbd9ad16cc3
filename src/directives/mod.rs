//! Built-in directives
//!
//! Each module provides the public constructor(s) returning a
//! [`DirectiveResult`](crate::DirectiveResult), the argument and state types,
//! a `validate` for the binding site where the directive is restricted, and
//! an `update` run by [`Runtime`] on every render that reaches it.

pub(crate) mod async_replace;
pub(crate) mod class_map;
pub(crate) mod element_ref;
pub(crate) mod guard;
pub(crate) mod keyed;
pub(crate) mod live;
pub(crate) mod repeat;
pub(crate) mod unsafe_markup;

pub use async_replace::{async_replace, async_replace_with, Producer};
pub use class_map::class_map;
pub use element_ref::{element_ref, ElementRef};
pub use guard::guard;
pub use keyed::keyed;
pub use live::live;
pub use repeat::{repeat, repeat_unkeyed};
pub use unsafe_markup::{unsafe_html, unsafe_svg};

pub(crate) use async_replace::AsyncReplaceArgs;
pub(crate) use class_map::ClassMapArgs;
pub(crate) use guard::GuardArgs;
pub(crate) use keyed::KeyedArgs;
pub(crate) use repeat::RepeatArgs;
pub(crate) use unsafe_markup::UnsafeMarkupArgs;

use tracing::trace;

use crate::directive::DirectiveState;
use crate::runtime::{Entry, Key, Runtime};

/// Connection hook of lifecycle-aware directives
pub(crate) fn connection_changed(rt: &mut Runtime, directive: Key, connected: bool) {
    let Some(Entry::Directive(entry)) = rt.arena.get_mut(directive) else {
        return;
    };
    match &mut entry.state {
        Some(DirectiveState::ElementRef(state)) => element_ref::connection_changed(state, connected),
        Some(DirectiveState::AsyncReplace(state)) => {
            // values keep accumulating in the producer; `flush` resumes them
            trace!(%directive, connected, pending = state.has_pending(), "async_replace connection");
        }
        _ => {}
    }
}
