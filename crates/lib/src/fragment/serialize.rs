//! XML fragment → ProseMirror document.

use serde_json::Value;
use yrs::{ReadTxn, XmlElementRef, XmlFragment, XmlOut, XmlTextRef};

use super::attrs::{element_attributes, read_chunks};
use super::errors::FragmentError;
use crate::Result;
use crate::constants::MARKS_ATTRIBUTE;
use crate::document::{Document, ElementNode, Node, TextNode};
use crate::mark::Mark;

/// Convert the children of `root` into a ProseMirror document.
///
/// Each element becomes an element node. Each text run expands to one text
/// node per attributed chunk, so a run with three differently formatted chunks
/// yields three adjacent text nodes. The tree is only read.
pub fn serialize<T: ReadTxn, F: XmlFragment>(txn: &T, root: &F) -> Result<Document> {
    Ok(Document::new(children_to_nodes(txn, root)?))
}

/// [`serialize`], returning the document as a JSON value.
pub fn fragment_to_json<T: ReadTxn, F: XmlFragment>(txn: &T, root: &F) -> Result<Value> {
    Ok(serialize(txn, root)?.to_value()?)
}

pub(crate) fn children_to_nodes<T: ReadTxn, F: XmlFragment>(
    txn: &T,
    parent: &F,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for index in 0..parent.len(txn) {
        match parent.get(txn, index) {
            Some(XmlOut::Element(element)) => {
                nodes.push(Node::Element(element_to_node(txn, &element)?));
            }
            Some(XmlOut::Text(text)) => nodes.extend(text_to_nodes(txn, &text)?),
            Some(XmlOut::Fragment(_)) => {
                return Err(FragmentError::UnsupportedChild {
                    index,
                    kind: "fragment".to_string(),
                }
                .into());
            }
            None => {}
        }
    }
    Ok(nodes)
}

pub(crate) fn element_to_node<T: ReadTxn>(txn: &T, element: &XmlElementRef) -> Result<ElementNode> {
    let tag = element.tag().to_string();
    let mut attrs = element_attributes(txn, element);

    let marks = match attrs.remove(MARKS_ATTRIBUTE) {
        Some(json) => Some(serde_json::from_str::<Vec<Mark>>(&json).map_err(|e| {
            tracing::warn!(tag = %tag, "Element carries an unreadable marks attribute");
            FragmentError::InvalidElementMarks {
                tag: tag.clone(),
                reason: e.to_string(),
            }
        })?),
        None => None,
    };

    Ok(ElementNode {
        attrs: attrs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
        marks,
        content: children_to_nodes(txn, element)?,
        node_type: tag,
    })
}

pub(crate) fn text_to_nodes<T: ReadTxn>(txn: &T, text: &XmlTextRef) -> Result<Vec<Node>> {
    read_chunks(txn, text)?
        .into_iter()
        .map(|chunk| -> Result<Node> {
            Ok(Node::Text(TextNode {
                marks: chunk.marks()?,
                text: chunk.text,
            }))
        })
        .collect()
}
