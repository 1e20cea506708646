//! Loosely-typed tree produced by the export parser
//!
//! Element attributes are keyed `@name`, child elements by their tag, and
//! element text by `#text`. A child tag that repeats becomes a [`Node::Seq`].

use std::borrow::Cow;

/// A value in the parsed export
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Number(f64),
    Seq(Vec<Node>),
    Map(Fields),
}

impl Node {
    /// Scalar rendering of a text or number node
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Node::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Node::Number(n) => Some(Cow::Owned(n.to_string())),
            Node::Seq(_) | Node::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Node::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a key when this node is a mapping
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// JSON rendering, used when a nested value has to fit in a single cell
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Text(s) => serde_json::Value::String(s.clone()),
            Node::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Node::Seq(items) => serde_json::Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::Number(n)
    }
}

/// Ordered key/value pairs of a mapping node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Node)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set a key, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Add a child element. A second child with the same key turns the
    /// entry into a sequence in document order.
    pub fn push_child(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, Node::Seq(items))) => items.push(value),
            Some(slot) => {
                let first = std::mem::replace(&mut slot.1, Node::Seq(Vec::new()));
                slot.1 = Node::Seq(vec![first, value]);
            }
            None => self.0.push((key, value)),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Fields {
    fn from_iter<T: IntoIterator<Item = (K, Node)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
