//! ProseMirror document → fresh XML fragment content.

use serde_json::Value;
use yrs::{Text, TransactionMut, Xml, XmlElementPrelim, XmlFragment, XmlTextPrelim};

use super::attrs::{Chunk, attribute_string, to_yattrs};
use crate::Result;
use crate::constants::MARKS_ATTRIBUTE;
use crate::document::{Document, ElementNode, Node, TextNode};

/// Append every node of `document` under `root`.
///
/// This only ever appends. Content already under `root` stays in front of the
/// new nodes, so use [`crate::fragment::Reconciler`] to update a populated tree.
///
/// Writes are not rolled back on failure: nodes written before an error stay
/// in the tree.
pub fn build<F: XmlFragment>(
    txn: &mut TransactionMut,
    root: &F,
    document: &Document,
) -> Result<()> {
    for node in &document.content {
        let index = root.len(&*txn);
        write_node(txn, root, index, node)?;
    }
    tracing::debug!(nodes = document.content.len(), "Built fragment content");
    Ok(())
}

/// Parse `json` as a document and [`build`] it under `root`.
pub fn json_to_fragment<F: XmlFragment>(
    txn: &mut TransactionMut,
    root: &F,
    json: &Value,
) -> Result<()> {
    let document = Document::from_value(json.clone())?;
    build(txn, root, &document)
}

/// Write `node` as a new child of `parent` at `index`.
pub(crate) fn write_node<F: XmlFragment>(
    txn: &mut TransactionMut,
    parent: &F,
    index: u32,
    node: &Node,
) -> Result<()> {
    match node {
        Node::Text(text) => write_text(txn, parent, index, text),
        Node::Element(element) => write_element(txn, parent, index, element),
    }
}

fn write_text<F: XmlFragment>(
    txn: &mut TransactionMut,
    parent: &F,
    index: u32,
    node: &TextNode,
) -> Result<()> {
    let text = parent.insert(txn, index, XmlTextPrelim::new(""));
    if node.text.is_empty() {
        return Ok(());
    }

    if node.marks.is_empty() {
        text.insert(txn, 0, &node.text);
    } else {
        let chunk = Chunk::from_marks(&node.text, &node.marks);
        text.insert_with_attributes(txn, 0, &node.text, to_yattrs(&chunk.attrs));
    }
    Ok(())
}

fn write_element<F: XmlFragment>(
    txn: &mut TransactionMut,
    parent: &F,
    index: u32,
    node: &ElementNode,
) -> Result<()> {
    let element = parent.insert(txn, index, XmlElementPrelim::empty(node.node_type.as_str()));

    for (key, value) in &node.attrs {
        element.insert_attribute(txn, key.as_str(), attribute_string(value));
    }
    if let Some(marks) = &node.marks {
        element.insert_attribute(txn, MARKS_ATTRIBUTE, serde_json::to_string(marks)?);
    }

    for (i, child) in node.content.iter().enumerate() {
        write_node(txn, &element, i as u32, child)?;
    }
    Ok(())
}
