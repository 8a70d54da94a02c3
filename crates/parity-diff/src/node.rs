//! Recursive value type for parsed response bodies

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed response body
///
/// Mirrors the JSON data model. Maps are keyed by a `BTreeMap` so key order in
/// the wire format never matters. Lists keep their wire order; the comparator
/// decides how order is treated.
///
/// The derived `PartialEq` is strict (list order matters). Use
/// [`Node::equivalent`] for the order-insensitive notion of equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    /// Integers and floats stay distinct: `1` and `1.0` are different values
    Number(Number),
    String(String),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

/// The variant of a [`Node`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Map,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Null => write!(f, "null"),
            NodeKind::Bool => write!(f, "bool"),
            NodeKind::Number => write!(f, "number"),
            NodeKind::String => write!(f, "string"),
            NodeKind::List => write!(f, "list"),
            NodeKind::Map => write!(f, "map"),
        }
    }
}

impl Node {
    /// Get the kind of this node
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Null => NodeKind::Null,
            Node::Bool(_) => NodeKind::Bool,
            Node::Number(_) => NodeKind::Number,
            Node::String(_) => NodeKind::String,
            Node::List(_) => NodeKind::List,
            Node::Map(_) => NodeKind::Map,
        }
    }

    /// Whether this node is a list or a map
    pub fn is_container(&self) -> bool {
        matches!(self, Node::List(_) | Node::Map(_))
    }

    /// Number of scalar leaves below this node (empty containers count as one)
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::List(items) => items.iter().map(Node::leaf_count).sum::<usize>().max(1),
            Node::Map(entries) => entries.values().map(Node::leaf_count).sum::<usize>().max(1),
            _ => 1,
        }
    }

    /// Canonical encoding that ignores list order
    ///
    /// Two nodes have the same fingerprint exactly when they are equal after
    /// sorting every list they contain.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        self.write_fingerprint(&mut out);
        out
    }

    fn write_fingerprint(&self, out: &mut String) {
        match self {
            Node::Null => out.push('n'),
            Node::Bool(true) => out.push('t'),
            Node::Bool(false) => out.push('f'),
            Node::Number(n) => {
                out.push('#');
                out.push_str(&n.to_string());
                out.push(';');
            }
            Node::String(s) => {
                out.push('s');
                out.push_str(&quote(s));
            }
            Node::List(items) => {
                let mut prints: Vec<String> = items.iter().map(Node::fingerprint).collect();
                prints.sort_unstable();
                out.push('[');
                for print in prints {
                    out.push_str(&print);
                    out.push(',');
                }
                out.push(']');
            }
            Node::Map(entries) => {
                out.push('{');
                for (key, value) in entries {
                    out.push_str(&quote(key));
                    out.push(':');
                    value.write_fingerprint(out);
                    out.push(',');
                }
                out.push('}');
            }
        }
    }

    /// Order-insensitive equality
    pub fn equivalent(&self, other: &Node) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Object(entries) => Node::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        Node::from(value.clone())
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            Node::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::from(self))
    }
}
