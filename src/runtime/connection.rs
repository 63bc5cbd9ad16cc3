//! Parent links and connection propagation
//!
//! Every part, instance and directive records its parent here. Only nodes on
//! a path to a lifecycle-aware directive carry a child set, so propagation
//! walks just those paths and skips every subtree without one.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use super::arena::Key;
use super::{Committed, Entry, Runtime};
use crate::directives;

#[derive(Debug, Default)]
struct Link {
    parent: Option<Key>,
    disconnectables: Option<BTreeSet<Key>>,
}

/// Side table of parent links and lazily allocated child sets
#[derive(Debug, Default)]
pub(crate) struct ConnectionTree {
    links: HashMap<Key, Link>,
}

impl ConnectionTree {
    pub(crate) fn attach(&mut self, child: Key, parent: Option<Key>) {
        self.links.entry(child).or_default().parent = parent;
    }

    pub(crate) fn parent(&self, key: Key) -> Option<Key> {
        self.links.get(&key).and_then(|link| link.parent)
    }

    /// Snapshot of `key`'s child set
    pub(crate) fn disconnectables(&self, key: Key) -> Vec<Key> {
        self.links
            .get(&key)
            .and_then(|link| link.disconnectables.as_ref())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_disconnectables(&self, key: Key) -> bool {
        self.links
            .get(&key)
            .and_then(|link| link.disconnectables.as_ref())
            .map_or(false, |set| !set.is_empty())
    }

    /// Register `key` with every ancestor up to the first that already has it
    pub(crate) fn add_disconnectable(&mut self, key: Key) {
        let mut child = key;
        while let Some(parent) = self.parent(child) {
            let set = self
                .links
                .entry(parent)
                .or_default()
                .disconnectables
                .get_or_insert_with(BTreeSet::new);
            if !set.insert(child) {
                break;
            }
            child = parent;
        }
    }

    /// Unregister `key`, pruning ancestors whose sets become empty
    pub(crate) fn remove_disconnectable(&mut self, key: Key) {
        let mut child = key;
        while let Some(parent) = self.parent(child) {
            let Some(set) = self
                .links
                .get_mut(&parent)
                .and_then(|link| link.disconnectables.as_mut())
            else {
                return;
            };
            set.remove(&child);
            if !set.is_empty() {
                break;
            }
            child = parent;
        }
    }

    /// Drop every trace of a released key
    pub(crate) fn forget(&mut self, key: Key) {
        let listed = self
            .parent(key)
            .and_then(|parent| self.links.get(&parent))
            .and_then(|link| link.disconnectables.as_ref())
            .map_or(false, |set| set.contains(&key));
        if listed {
            self.remove_disconnectable(key);
        }
        self.links.remove(&key);
    }
}

impl Runtime {
    /// Connection state, read from the root flag above `key`
    pub(crate) fn is_connected(&self, key: Key) -> bool {
        let mut current = key;
        while let Some(parent) = self.tree.parent(current) {
            current = parent;
        }
        match self.arena.get(current) {
            Some(Entry::Child(part)) => part.connected,
            _ => true,
        }
    }

    /// Propagate a connection change to everything listed below `parent`
    pub(crate) fn notify_children(&mut self, parent: Key, connected: bool) {
        for child in self.tree.disconnectables(parent) {
            if matches!(self.arena.get(child), Some(Entry::Directive(_))) {
                self.notify_directive_connection(child, connected, false);
            }
            self.notify_children(child, connected);
        }
    }

    /// Update a directive's cached state and run its hook on a change.
    ///
    /// When `clearing`, the directive is leaving the tree: its own children
    /// are notified and it is unlisted from its ancestors.
    pub(crate) fn notify_directive_connection(&mut self, directive: Key, connected: bool, clearing: bool) {
        let changed = match self.arena.get_mut(directive) {
            Some(Entry::Directive(entry)) if entry.kind.is_async() && entry.connected != connected => {
                entry.connected = connected;
                true
            }
            _ => false,
        };
        if changed {
            trace!(%directive, connected, "directive connection changed");
            directives::connection_changed(self, directive, connected);
        }
        if clearing {
            self.notify_children(directive, connected);
            self.tree.remove_disconnectable(directive);
        }
    }

    /// Connection hook of a child part.
    ///
    /// With `clearing`, only the committed instance or the items from
    /// `from` onwards are detached; otherwise the whole subtree follows
    /// `connected`.
    pub(crate) fn notify_child_part_connection(
        &mut self,
        part: Key,
        connected: bool,
        clearing: bool,
        from: usize,
    ) {
        if !self.tree.has_disconnectables(part) {
            return;
        }
        if !clearing {
            self.notify_children(part, connected);
            return;
        }
        let cleared: Vec<Key> = match self.arena.get(part) {
            Some(Entry::Child(child)) => match &child.committed {
                Committed::Instance(instance) => vec![*instance],
                Committed::Items(items) => items.iter().skip(from).copied().collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        for key in cleared {
            self.notify_children(key, false);
            self.tree.remove_disconnectable(key);
        }
    }
}
