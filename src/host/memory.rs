//! In-memory reference host
//!
//! A flat arena of nodes with a mutation counter. It implements just enough of
//! a document for the engine: markup parsing through [`super::markup`], deep
//! clones, attributes, properties and listener bookkeeping. Event dispatch is
//! driven by [`Renderer::dispatch_event`](crate::Renderer::dispatch_event).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::markup::{self, escape_attribute, escape_text, is_raw_text_element, Event};
use super::{Host, ListenerHandle, ListenerOptions, NodeId, NodeKind};
use crate::value::Value;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: String,
    data: String,
    attributes: Vec<(String, String)>,
    properties: BTreeMap<String, Value>,
    listeners: Vec<(String, ListenerHandle, ListenerOptions)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            data: String::new(),
            attributes: Vec::new(),
            properties: BTreeMap::new(),
            listeners: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed document used by tests and the CLI.
///
/// Nodes are never freed: a removed node stays in the arena, detached, and
/// its `NodeId` remains valid for the life of the host.
///
/// # Panics
///
/// Every method panics when given a `NodeId` that this host did not create.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<NodeData>,
    mutations: usize,
}

impl MemoryHost {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.name = name.to_string();
        self.alloc(data)
    }

    /// Append `child` to `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Number of tree mutations performed so far
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Children of a node, in order
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    /// Inner markup of `node`, including every comment
    pub fn html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.node(node).children {
            self.serialize(child, &mut out, false);
        }
        out
    }

    /// Inner markup of `node` with binding anchors and empty comments hidden
    pub fn rendered_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.node(node).children {
            self.serialize(child, &mut out, true);
        }
        out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let data = self.node(node);
        match data.kind {
            NodeKind::Text => data.data.clone(),
            NodeKind::Comment => String::new(),
            _ => data
                .children
                .iter()
                .map(|&c| self.text_content(c))
                .collect(),
        }
    }

    /// First element named `name` below `root`, in document order
    pub fn find_element(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.find_all(root, name).into_iter().next()
    }

    /// All elements named `name` below `root`, in document order
    pub fn find_all(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect(root, name, &mut found);
        found
    }

    fn collect(&self, node: NodeId, name: &str, found: &mut Vec<NodeId>) {
        for &child in &self.node(node).children {
            let data = self.node(child);
            if data.kind == NodeKind::Element && data.name.eq_ignore_ascii_case(name) {
                found.push(child);
            }
            self.collect(child, name, found);
        }
    }

    /// Panics on a foreign id, as documented on [`MemoryHost`]
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != node);
        }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.detach(node);
        let siblings = &mut self.node_mut(parent).children;
        let at = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(at, node);
        self.node_mut(node).parent = Some(parent);
    }

    fn build(&mut self, root: NodeId, events: Vec<Event>) {
        let mut stack = vec![root];
        let mut foreign_depth: Vec<bool> = vec![false];

        for event in events {
            let parent = *stack.last().unwrap_or(&root);
            let foreign = *foreign_depth.last().unwrap_or(&false);
            match event {
                Event::Open {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let is_foreign = foreign
                        || name.eq_ignore_ascii_case("svg")
                        || name.eq_ignore_ascii_case("math");
                    let name = if is_foreign {
                        name
                    } else {
                        name.to_ascii_lowercase()
                    };
                    let mut element = NodeData::new(NodeKind::Element);
                    for (attr, value) in attributes {
                        let attr = if is_foreign {
                            attr
                        } else {
                            attr.to_ascii_lowercase()
                        };
                        // The first occurrence of a duplicated attribute wins.
                        if !element.attributes.iter().any(|(n, _)| *n == attr) {
                            element.attributes.push((attr, value));
                        }
                    }
                    let is_void = VOID_ELEMENTS.contains(&name.as_str());
                    element.name = name;
                    let id = self.alloc(element);
                    self.attach(parent, id, None);
                    if !(is_void || (is_foreign && self_closing)) {
                        stack.push(id);
                        foreign_depth.push(is_foreign);
                    }
                }
                Event::Close(name) => {
                    let position = stack
                        .iter()
                        .rposition(|&n| n != root && self.node(n).name.eq_ignore_ascii_case(&name));
                    if let Some(position) = position {
                        stack.truncate(position);
                        foreign_depth.truncate(position);
                    }
                }
                Event::Text(data) => {
                    let mut text = NodeData::new(NodeKind::Text);
                    text.data = data;
                    let id = self.alloc(text);
                    self.attach(parent, id, None);
                }
                Event::Comment(data) => {
                    let mut comment = NodeData::new(NodeKind::Comment);
                    comment.data = data;
                    let id = self.alloc(comment);
                    self.attach(parent, id, None);
                }
            }
        }
    }

    fn deep_clone(&mut self, node: NodeId) -> NodeId {
        let source = self.node(node);
        let mut copy = NodeData::new(source.kind);
        copy.name = source.name.clone();
        copy.data = source.data.clone();
        copy.attributes = source.attributes.clone();
        let children = source.children.clone();
        let id = self.alloc(copy);
        for child in children {
            let child_copy = self.deep_clone(child);
            self.attach(id, child_copy, None);
        }
        id
    }

    fn serialize(&self, node: NodeId, out: &mut String, hide_anchors: bool) {
        let data = self.node(node);
        match data.kind {
            NodeKind::Text => {
                let raw = data
                    .parent
                    .map(|p| is_raw_text_element(&self.node(p).name))
                    .unwrap_or(false);
                if raw {
                    out.push_str(&data.data);
                } else {
                    out.push_str(&escape_text(&data.data));
                }
            }
            NodeKind::Comment => {
                let anchor = data.data.is_empty()
                    || data.data == "?"
                    || data.data.starts_with("?lit$");
                if !(hide_anchors && anchor) {
                    let _ = write!(out, "<!--{}-->", data.data);
                }
            }
            NodeKind::Fragment => {
                for &child in &data.children {
                    self.serialize(child, out, hide_anchors);
                }
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&data.name);
                for (name, value) in &data.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {}", name);
                    } else {
                        let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&data.name.as_str()) {
                    return;
                }
                for &child in &data.children {
                    self.serialize(child, out, hide_anchors);
                }
                let _ = write!(out, "</{}>", data.name);
            }
        }
    }
}

impl Host for MemoryHost {
    fn create_text(&mut self, data: &str) -> NodeId {
        let mut node = NodeData::new(NodeKind::Text);
        node.data = data.to_string();
        self.alloc(node)
    }

    fn create_comment(&mut self, data: &str) -> NodeId {
        let mut node = NodeData::new(NodeKind::Comment);
        node.data = data.to_string();
        self.alloc(node)
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Fragment))
    }

    fn parse_fragment(&mut self, markup: &str) -> NodeId {
        let root = self.create_fragment();
        let events = markup::tokenize(markup);
        self.build(root, events);
        root
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        self.deep_clone(node)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        let data = self.node(node);
        (data.kind == NodeKind::Element).then(|| data.name.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).children.first().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let siblings = &self.node(parent).children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.mutations += 1;
        if self.node(node).kind == NodeKind::Fragment {
            let children = std::mem::take(&mut self.node_mut(node).children);
            for child in children {
                self.node_mut(child).parent = None;
                self.attach(parent, child, reference);
            }
        } else {
            self.attach(parent, node, reference);
        }
    }

    fn remove(&mut self, node: NodeId) {
        self.mutations += 1;
        self.detach(node);
    }

    fn text(&self, node: NodeId) -> String {
        self.node(node).data.clone()
    }

    fn set_text(&mut self, node: NodeId, data: &str) {
        self.mutations += 1;
        let node = self.node_mut(node);
        if node.kind == NodeKind::Element {
            node.children.clear();
        }
        node.data = data.to_string();
    }

    fn attribute_names(&self, element: NodeId) -> Vec<String> {
        self.node(element)
            .attributes
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn get_attribute(&self, element: NodeId, name: &str) -> Option<String> {
        self.node(element)
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) {
        self.mutations += 1;
        let attributes = &mut self.node_mut(element).attributes;
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attribute(&mut self, element: NodeId, name: &str) {
        self.mutations += 1;
        self.node_mut(element).attributes.retain(|(n, _)| n != name);
    }

    fn set_property(&mut self, element: NodeId, name: &str, value: &Value) {
        self.mutations += 1;
        let properties = &mut self.node_mut(element).properties;
        match value {
            Value::Nothing => {
                properties.remove(name);
            }
            other => {
                properties.insert(name.to_string(), other.clone());
            }
        }
    }

    fn get_property(&self, element: NodeId, name: &str) -> Option<Value> {
        self.node(element).properties.get(name).cloned()
    }

    fn add_event_listener(
        &mut self,
        element: NodeId,
        name: &str,
        handle: ListenerHandle,
        options: ListenerOptions,
    ) {
        let listeners = &mut self.node_mut(element).listeners;
        // Registering the same (name, handle, capture) twice is a no-op.
        if listeners
            .iter()
            .any(|(n, h, o)| n == name && *h == handle && o.capture == options.capture)
        {
            return;
        }
        listeners.push((name.to_string(), handle, options));
        self.mutations += 1;
    }

    fn remove_event_listener(
        &mut self,
        element: NodeId,
        name: &str,
        handle: ListenerHandle,
        options: ListenerOptions,
    ) {
        self.mutations += 1;
        self.node_mut(element)
            .listeners
            .retain(|(n, h, o)| !(n == name && *h == handle && o.capture == options.capture));
    }

    fn listeners(&self, element: NodeId, name: &str) -> Vec<(ListenerHandle, ListenerOptions)> {
        self.node(element)
            .listeners
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, h, o)| (*h, *o))
            .collect()
    }
}
