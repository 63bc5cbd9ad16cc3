//! Values committed to parts

use std::fmt;
use std::rc::Rc;

use crate::directive::DirectiveResult;
use crate::host::{ListenerOptions, NodeId};
use crate::strings::TemplateStrings;

/// Which wrapper element a template's markup is parsed inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResultKind {
    Html,
    Svg,
    MathMl,
}

/// A fragment sequence, its kind, and the values for its slots
#[derive(Clone)]
pub struct TemplateResult {
    strings: TemplateStrings,
    kind: ResultKind,
    values: Vec<Value>,
}

impl TemplateResult {
    pub fn new(strings: TemplateStrings, kind: ResultKind, values: Vec<Value>) -> Self {
        Self {
            strings,
            kind,
            values,
        }
    }

    pub fn strings(&self) -> &TemplateStrings {
        &self.strings
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Debug for TemplateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResult")
            .field("strings", &self.strings.id())
            .field("kind", &self.kind)
            .field("values", &self.values)
            .finish()
    }
}

/// An event delivered to a listener
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// An event handler plus the options it is registered with
#[derive(Clone)]
pub struct Listener {
    handler: Rc<dyn Fn(&Event)>,
    options: ListenerOptions,
}

impl Listener {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            options: ListenerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ListenerOptions {
        self.options
    }

    pub fn call(&self, event: &Event) {
        (self.handler)(event)
    }

    /// Same handler closure (options are not compared)
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("handler", &Rc::as_ptr(&self.handler))
            .field("options", &self.options)
            .finish()
    }
}

/// Stable key for keyed list reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Int(i64),
    Str(Rc<str>),
}

impl From<i64> for ItemKey {
    fn from(value: i64) -> Self {
        ItemKey::Int(value)
    }
}

impl From<i32> for ItemKey {
    fn from(value: i32) -> Self {
        ItemKey::Int(value.into())
    }
}

impl From<u32> for ItemKey {
    fn from(value: u32) -> Self {
        ItemKey::Int(value.into())
    }
}

impl From<usize> for ItemKey {
    fn from(value: usize) -> Self {
        ItemKey::Int(value as i64)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        ItemKey::Str(Rc::from(value))
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        ItemKey::Str(Rc::from(value))
    }
}

/// Anything that can be bound to a slot
#[derive(Clone, Default)]
pub enum Value {
    /// The absent sentinel: clears child content, removes attributes
    #[default]
    Nothing,
    /// Leave whatever is committed untouched
    NoChange,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Node(NodeId),
    Template(TemplateResult),
    List(Vec<Value>),
    Directive(DirectiveResult),
    Listener(Listener),
}

impl Value {
    /// Primitives are compared by value; everything else always counts as changed
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Nothing | Value::NoChange | Value::Bool(_) | Value::Number(_) | Value::Str(_)
        )
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// Strict equality: strings by content, numbers by IEEE equality, nodes
    /// and listeners by identity. Templates, lists and directive results are
    /// never equal.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::NoChange, Value::NoChange) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Listener(a), Value::Listener(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Truthiness used by boolean attributes
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing | Value::NoChange => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// String form written to text nodes and attributes
    pub fn to_text(&self) -> String {
        match self {
            Value::Nothing | Value::NoChange => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Node(_) => "[node]".to_string(),
            Value::Template(_) => "[template]".to_string(),
            Value::Directive(_) => "[directive]".to_string(),
            Value::Listener(_) => "[listener]".to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => write!(f, "Nothing"),
            Value::NoChange => write!(f, "NoChange"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Node(n) => write!(f, "Node({})", n.0),
            Value::Template(t) => t.fmt(f),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Directive(d) => write!(f, "Directive({:?})", d.kind()),
            Value::Listener(l) => l.fmt(f),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(Rc::from(value.as_str()))
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Number(value as f64)
            }
        })*
    };
}

number_from!(i32, i64, u32, u64, usize, f32, f64);

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Node(value)
    }
}

impl From<TemplateResult> for Value {
    fn from(value: TemplateResult) -> Self {
        Value::Template(value)
    }
}

impl From<DirectiveResult> for Value {
    fn from(value: DirectiveResult) -> Self {
        Value::Directive(value)
    }
}

impl From<Listener> for Value {
    fn from(value: Listener) -> Self {
        Value::Listener(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_equality() {
        assert!(Value::from("a").same_value(&Value::from("a".to_string())));
        assert!(!Value::Number(f64::NAN).same_value(&Value::Number(f64::NAN)));
        assert!(!Value::from(1).same_value(&Value::from("1")));
        assert!(!Value::List(vec![]).same_value(&Value::List(vec![])));
    }

    #[test]
    fn test_listener_identity() {
        let a = Listener::new(|_| {});
        let b = a.clone().with_options(ListenerOptions {
            capture: true,
            ..Default::default()
        });
        assert!(Value::from(a.clone()).same_value(&Value::from(b)));
        assert!(!Value::from(a).same_value(&Value::from(Listener::new(|_| {}))));
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(Value::from(3).to_text(), "3");
        assert_eq!(Value::from(0.5).to_text(), "0.5");
        assert_eq!(Value::from(f64::INFINITY).to_text(), "Infinity");
        assert_eq!(Value::from(vec![1, 2]).to_text(), "1,2");
        assert_eq!(Value::Nothing.to_text(), "");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::Nothing.is_truthy());
    }

    #[test]
    fn test_option_maps_none_to_nothing() {
        assert!(Value::from(None::<i32>).is_nothing());
        assert!(Value::from(Some("a")).same_value(&Value::from("a")));
    }
}
