//! Typed ProseMirror nodes.
//!
//! The wire shape is schema-agnostic: element nodes are
//! `{type, attrs?, marks?, content?}` and text nodes are
//! `{type: "text", text, marks?}`. Deserialization goes through a loose
//! intermediate form so validation errors can name the offending node.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::DocumentError;
use crate::constants::{DOC_TYPE, TEXT_TYPE};
use crate::mark::{Attrs, Mark};

/// A full ProseMirror document. Always serialized with `"type": "doc"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub content: Vec<Node>,
}

/// A node inside a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

/// A non-text node such as `paragraph` or `heading`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub node_type: String,
    pub attrs: Attrs,
    /// Marks attached to the node as a whole.
    pub marks: Option<Vec<Mark>>,
    pub content: Vec<Node>,
}

/// A run of text sharing one set of marks.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    /// Parse and validate a document from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let raw: RawNode =
            serde_json::from_value(value).map_err(|e| DocumentError::Malformed {
                reason: e.to_string(),
            })?;
        raw.into_document()
    }

    /// Parse and validate a document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let raw: RawNode = serde_json::from_str(json).map_err(|e| DocumentError::Malformed {
            reason: e.to_string(),
        })?;
        raw.into_document()
    }

    /// The document as a JSON value.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// All text of the document, concatenated in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.content {
            node.collect_text(&mut out);
        }
        out
    }
}

impl Node {
    /// The node's `type` field.
    pub fn node_type(&self) -> &str {
        match self {
            Node::Element(element) => &element.node_type,
            Node::Text(_) => TEXT_TYPE,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(element) => {
                for child in &element.content {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl ElementNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            attrs: Map::new(),
            marks: None,
            content: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.get_or_insert_with(Vec::new).push(mark);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.content.push(child.into());
        self
    }
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }
}

impl From<ElementNode> for Node {
    fn from(element: ElementNode) -> Self {
        Node::Element(element)
    }
}

impl From<TextNode> for Node {
    fn from(text: TextNode) -> Self {
        Node::Text(text)
    }
}

// ===== SERDE =====

/// Loose form of any node, before validation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    node_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marks: Option<Vec<Mark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Vec<RawNode>>,
}

const ROOT_PATH: &str = "$";

fn child_path(path: &str, index: usize) -> String {
    format!("{path}.content[{index}]")
}

impl RawNode {
    fn checked_type(&mut self, path: &str) -> Result<String, DocumentError> {
        let node_type = match self.node_type.take() {
            Some(Value::String(node_type)) => node_type,
            _ => {
                return Err(DocumentError::MissingType {
                    path: path.to_string(),
                });
            }
        };
        if node_type.is_empty() {
            return Err(DocumentError::EmptyType {
                path: path.to_string(),
            });
        }
        Ok(node_type)
    }

    fn into_document(mut self) -> Result<Document, DocumentError> {
        let node_type = self.checked_type(ROOT_PATH)?;
        if node_type != DOC_TYPE {
            return Err(DocumentError::UnexpectedRoot { node_type });
        }
        if self.text.is_some() {
            return Err(DocumentError::UnexpectedField {
                path: ROOT_PATH.to_string(),
                node_type,
                field: "text".to_string(),
            });
        }
        Ok(Document {
            content: Self::children(self.content, ROOT_PATH)?,
        })
    }

    fn into_node(mut self, path: &str) -> Result<Node, DocumentError> {
        let node_type = self.checked_type(path)?;
        let unexpected = |field: &str, node_type: String| DocumentError::UnexpectedField {
            path: path.to_string(),
            node_type,
            field: field.to_string(),
        };

        if node_type == TEXT_TYPE {
            if self.content.is_some() {
                return Err(unexpected("content", node_type));
            }
            if self.attrs.is_some() {
                return Err(unexpected("attrs", node_type));
            }
            return Ok(Node::Text(TextNode {
                text: self.text.unwrap_or_default(),
                marks: self.marks.unwrap_or_default(),
            }));
        }

        if self.text.is_some() {
            return Err(unexpected("text", node_type));
        }
        Ok(Node::Element(ElementNode {
            node_type,
            attrs: self.attrs.unwrap_or_default(),
            marks: self.marks,
            content: Self::children(self.content, path)?,
        }))
    }

    fn children(content: Option<Vec<RawNode>>, path: &str) -> Result<Vec<Node>, DocumentError> {
        content
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, raw)| raw.into_node(&child_path(path, i)))
            .collect()
    }

    fn from_node(node: &Node) -> Self {
        match node {
            Node::Text(text) => RawNode {
                node_type: Some(Value::String(TEXT_TYPE.to_string())),
                text: Some(text.text.clone()),
                marks: (!text.marks.is_empty()).then(|| text.marks.clone()),
                ..Default::default()
            },
            Node::Element(element) => RawNode {
                node_type: Some(Value::String(element.node_type.clone())),
                attrs: (!element.attrs.is_empty()).then(|| element.attrs.clone()),
                marks: element.marks.clone(),
                content: (!element.content.is_empty())
                    .then(|| element.content.iter().map(RawNode::from_node).collect()),
                ..Default::default()
            },
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawNode::from_node(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawNode::deserialize(deserializer)?
            .into_node(ROOT_PATH)
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawNode {
            node_type: Some(Value::String(DOC_TYPE.to_string())),
            content: Some(self.content.iter().map(RawNode::from_node).collect()),
            ..Default::default()
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawNode::deserialize(deserializer)?
            .into_document()
            .map_err(serde::de::Error::custom)
    }
}
