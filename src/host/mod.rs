//! Host node-tree substrate
//!
//! The engine never owns nodes. Everything it does to the document goes through
//! the [`Host`] trait: creating and moving nodes, parsing markup, and the
//! attribute, property and listener primitives. [`MemoryHost`] is the in-memory
//! reference implementation used by the tests and the CLI.

pub(crate) mod markup;
mod memory;

pub use memory::MemoryHost;

use crate::value::Value;

/// Handle to a node owned by a [`Host`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Kind of a host node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Fragment,
}

/// Opaque token the engine registers as an event listener.
///
/// The host hands it back on dispatch; the engine maps it to the event part
/// that currently owns the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Options a listener was registered with. Removal must match them exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

/// Mutable node tree the engine renders into.
pub trait Host {
    fn create_text(&mut self, data: &str) -> NodeId;
    fn create_comment(&mut self, data: &str) -> NodeId;
    fn create_fragment(&mut self) -> NodeId;

    /// Parse markup into a new fragment node.
    fn parse_fragment(&mut self, markup: &str) -> NodeId;

    /// Deep-clone `node` and its descendants. The clone is detached.
    fn clone_subtree(&mut self, node: NodeId) -> NodeId;

    fn kind(&self, node: NodeId) -> NodeKind;

    /// Local name of an element, `None` for other kinds.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Insert `node` into `parent` before `reference` (append when `None`).
    ///
    /// Inserting a fragment moves its children and leaves it empty. A node that
    /// already has a parent is moved.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Detach `node` from its parent.
    fn remove(&mut self, node: NodeId);

    /// Character data of a text or comment node.
    fn text(&self, node: NodeId) -> String;
    fn set_text(&mut self, node: NodeId, data: &str);

    /// Attribute names of an element in document order.
    fn attribute_names(&self, element: NodeId) -> Vec<String>;
    fn get_attribute(&self, element: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, element: NodeId, name: &str);

    fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.get_attribute(element, name).is_some()
    }

    /// Set a property. [`Value::Nothing`] unsets it.
    fn set_property(&mut self, element: NodeId, name: &str, value: &Value);
    fn get_property(&self, element: NodeId, name: &str) -> Option<Value>;

    fn add_event_listener(
        &mut self,
        element: NodeId,
        name: &str,
        handle: ListenerHandle,
        options: ListenerOptions,
    );
    fn remove_event_listener(
        &mut self,
        element: NodeId,
        name: &str,
        handle: ListenerHandle,
        options: ListenerOptions,
    );

    /// Listeners currently registered on `element` for `name`.
    fn listeners(&self, element: NodeId, name: &str) -> Vec<(ListenerHandle, ListenerOptions)>;
}

/// Pre-order walk over element and comment nodes below `root`.
///
/// Returns the node following `current`, never `root` itself. Text nodes are
/// skipped; this is the order the marker compiler assumes.
pub(crate) fn next_in_walk(host: &dyn Host, root: NodeId, current: NodeId) -> Option<NodeId> {
    let mut node = current;
    loop {
        node = step_preorder(host, root, node)?;
        match host.kind(node) {
            NodeKind::Element | NodeKind::Comment => return Some(node),
            NodeKind::Text | NodeKind::Fragment => continue,
        }
    }
}

fn step_preorder(host: &dyn Host, root: NodeId, node: NodeId) -> Option<NodeId> {
    if let Some(child) = host.first_child(node) {
        return Some(child);
    }
    let mut node = node;
    loop {
        if node == root {
            return None;
        }
        if let Some(sibling) = host.next_sibling(node) {
            return Some(sibling);
        }
        node = host.parent(node)?;
    }
}

/// Whether `ancestor` is `node` or one of its ancestors.
pub(crate) fn contains(host: &dyn Host, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == ancestor {
            return true;
        }
        current = host.parent(n);
    }
    false
}
