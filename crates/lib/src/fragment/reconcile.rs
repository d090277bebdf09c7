//! In-place update of an XML fragment toward a desired document.
//!
//! Rebuilding a fragment from scratch would delete every CRDT item and
//! insert new ones. Peers that edited concurrently would then see their
//! edits land inside deleted content. The reconciler instead computes a
//! small edit script and keeps every untouched element and character:
//!
//! 1. Siblings are grouped into items: each element is one item, and each
//!    maximal run of adjacent text is one item.
//! 2. Items whose serialized form is identical to a desired item are aligned
//!    first (longest common subsequence). They are left alone.
//! 3. The gaps between those anchors are aligned again by kind (same tag, or
//!    both text). Matched elements get their attributes patched and their
//!    children reconciled recursively. Matched text is diffed by common
//!    prefix and suffix.
//! 4. Whatever is left is removed, or written fresh at its position.
//!
//! Ties always go to the earliest remaining candidate in document order.

use std::collections::BTreeMap;
use std::ops::Range;

use serde_json::Value;
use tracing::{debug, trace};
use yrs::types::Attrs as YAttrs;
use yrs::{
    Any, OffsetKind, Text, TransactionMut, Xml, XmlElementRef, XmlFragment, XmlOut, XmlTextRef,
};

use super::attrs::{
    Chunk, attribute_string, element_attributes, json_to_any, read_chunks, stored_form,
    to_yattrs, unit_len,
};
use super::build::write_node;
use super::errors::FragmentError;
use super::serialize::{element_to_node, text_to_nodes};
use crate::Result;
use crate::constants::MARKS_ATTRIBUTE;
use crate::document::{Document, ElementNode, Node, TextNode};
use crate::mark::{Attrs, Mark};

/// Counts of the edit script applied by one reconcile pass, over all levels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Items left exactly as they were
    pub unchanged: usize,
    /// Items patched in place
    pub updated: usize,
    /// Items deleted
    pub removed: usize,
    /// Items written fresh
    pub inserted: usize,
}

/// Updates a populated fragment in place.
///
/// Text offsets are issued in `offset_kind` units, which must match the
/// [`yrs::Options::offset_kind`] of the document being edited.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    offset_kind: OffsetKind,
}

impl Reconciler {
    pub fn new(offset_kind: OffsetKind) -> Self {
        Self { offset_kind }
    }

    /// Mutate the children of `root` until they serialize to `document`.
    ///
    /// Writes are not rolled back on failure. A failed pass may leave the
    /// tree partially updated, and running it again converges.
    pub fn reconcile<F: XmlFragment>(
        &self,
        txn: &mut TransactionMut,
        root: &F,
        document: &Document,
    ) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        self.reconcile_children(txn, root, &document.content, &mut stats)?;
        debug!(
            unchanged = stats.unchanged,
            updated = stats.updated,
            removed = stats.removed,
            inserted = stats.inserted,
            "Reconciled fragment"
        );
        Ok(stats)
    }

    /// Parse `json` as a document and [`reconcile`](Self::reconcile) toward it.
    pub fn reconcile_json<F: XmlFragment>(
        &self,
        txn: &mut TransactionMut,
        root: &F,
        json: &Value,
    ) -> Result<ReconcileStats> {
        let document = Document::from_value(json.clone())?;
        self.reconcile(txn, root, &document)
    }

    fn reconcile_children<F: XmlFragment>(
        &self,
        txn: &mut TransactionMut,
        parent: &F,
        desired: &[Node],
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let current = current_items(&*txn, parent)?;
        let desired = desired_items(desired);

        let current_nodes = current
            .iter()
            .map(|item| item.to_nodes(&*txn))
            .collect::<Result<Vec<_>>>()?;
        let desired_nodes: Vec<Vec<Node>> = desired
            .iter()
            .map(|item| item.iter().map(normalized).collect())
            .collect();

        let edits = edit_script(
            current.len(),
            desired.len(),
            |i, j| current_nodes[i] == desired_nodes[j],
            |i, j| same_kind(&current[i], desired[j]),
        );

        let mut index = 0u32;
        for edit in edits {
            match edit {
                Edit::Unchanged(i, _) => {
                    index += current[i].span();
                    stats.unchanged += 1;
                }
                Edit::Update(i, j) => {
                    trace!(index, "Updating child in place");
                    index += self.update_item(txn, parent, index, &current[i], desired[j], stats)?;
                    stats.updated += 1;
                }
                Edit::Remove(i) => {
                    let span = current[i].span();
                    trace!(index, span, "Removing child");
                    parent.remove_range(txn, index, span);
                    stats.removed += 1;
                }
                Edit::Insert(j) => {
                    trace!(index, count = desired[j].len(), "Inserting child");
                    for node in desired[j] {
                        write_node(txn, parent, index, node)?;
                        index += 1;
                    }
                    stats.inserted += 1;
                }
            }
        }
        Ok(())
    }

    /// Patch one matched item. Returns how many children it now spans.
    fn update_item<F: XmlFragment>(
        &self,
        txn: &mut TransactionMut,
        parent: &F,
        index: u32,
        current: &Current,
        desired: &[Node],
        stats: &mut ReconcileStats,
    ) -> Result<u32> {
        match (current, &desired[0]) {
            (Current::Element(element), Node::Element(node)) => {
                update_attributes(txn, element, node)?;
                self.reconcile_children(txn, element, &node.content, stats)?;
                Ok(1)
            }
            (Current::Texts(texts), Node::Text(_)) => {
                let nodes: Vec<&TextNode> = desired
                    .iter()
                    .filter_map(|node| match node {
                        Node::Text(text) => Some(text),
                        Node::Element(_) => None,
                    })
                    .collect();
                self.update_texts(txn, texts, &nodes)?;
                Ok(remove_empty_texts(txn, parent, index, texts))
            }
            _ => {
                parent.remove_range(txn, index, current.span());
                for (offset, node) in desired.iter().enumerate() {
                    write_node(txn, parent, index + offset as u32, node)?;
                }
                Ok(desired.len() as u32)
            }
        }
    }

    /// Edit a group of adjacent text runs so that, read in order, they hold
    /// the desired chunks.
    fn update_texts(
        &self,
        txn: &mut TransactionMut,
        texts: &[XmlTextRef],
        desired: &[&TextNode],
    ) -> Result<()> {
        let kind = self.offset_kind;
        let wanted: Vec<Chunk> = desired
            .iter()
            .map(|node| Chunk::from_marks(&node.text, &node.marks))
            .collect();
        let wanted_chars: Vec<char> = wanted.iter().flat_map(|c| c.text.chars()).collect();

        let mut current: Vec<Vec<char>> = Vec::with_capacity(texts.len());
        for text in texts {
            let chunks = read_chunks(&*txn, text)?;
            current.push(chunks.iter().flat_map(|c| c.text.chars()).collect());
        }
        let current_chars = current.concat();

        let prefix = common_prefix(&current_chars, &wanted_chars);
        let suffix = common_suffix(&current_chars[prefix..], &wanted_chars[prefix..]);
        let removed = prefix..current_chars.len() - suffix;
        let inserted = prefix..wanted_chars.len() - suffix;

        if !removed.is_empty() {
            let mut start = 0;
            for (text, chars) in texts.iter().zip(&current) {
                let end = start + chars.len();
                if let Some(local) = overlap(&removed, start..end) {
                    let offset = unit_len(&chars[..local.start], kind);
                    let len = unit_len(&chars[local], kind);
                    text.remove_range(txn, offset, len);
                }
                start = end;
            }
        }

        if !inserted.is_empty() {
            let (target, local) = insertion_point(&current, prefix);
            let text = &texts[target];
            let mut offset = unit_len(&current[target][..local], kind);
            let mut start = 0;
            for chunk in &wanted {
                let chars: Vec<char> = chunk.text.chars().collect();
                let end = start + chars.len();
                if let Some(local) = overlap(&inserted, start..end) {
                    let piece = &chars[local];
                    let content: String = piece.iter().collect();
                    text.insert_with_attributes(txn, offset, &content, to_yattrs(&chunk.attrs));
                    offset += unit_len(piece, kind);
                }
                start = end;
            }
        }

        trace!(
            prefix,
            suffix,
            removed = removed.len(),
            inserted = inserted.len(),
            "Diffed text group"
        );
        self.apply_formatting(txn, texts, &wanted)
    }

    /// Reformat every range whose attributes differ from the desired chunk.
    fn apply_formatting(
        &self,
        txn: &mut TransactionMut,
        texts: &[XmlTextRef],
        wanted: &[Chunk],
    ) -> Result<()> {
        let kind = self.offset_kind;
        let mut wanted_ranges: Vec<(Range<usize>, &Attrs)> = Vec::with_capacity(wanted.len());
        let mut position = 0;
        for chunk in wanted {
            let len = chunk.text.chars().count();
            wanted_ranges.push((position..position + len, &chunk.attrs));
            position += len;
        }

        let mut text_start = 0;
        for text in texts {
            let mut formats = Vec::new();
            let mut chunk_start = text_start;
            let mut units_before = 0u32;
            for chunk in read_chunks(&*txn, text)? {
                let chars: Vec<char> = chunk.text.chars().collect();
                let chunk_range = chunk_start..chunk_start + chars.len();
                for (range, attrs) in &wanted_ranges {
                    if **attrs == chunk.attrs {
                        continue;
                    }
                    if let Some(local) = overlap(range, chunk_range.clone()) {
                        let offset = units_before + unit_len(&chars[..local.start], kind);
                        let len = unit_len(&chars[local], kind);
                        formats.push((offset, len, format_patch(&chunk.attrs, attrs)));
                    }
                }
                units_before += unit_len(&chars, kind);
                chunk_start = chunk_range.end;
            }
            for (offset, len, patch) in formats {
                text.format(txn, offset, len, patch);
            }
            text_start = chunk_start;
        }
        Ok(())
    }
}

// ===== SIBLING ITEMS =====

/// A group of existing siblings that reconcile as one unit.
enum Current {
    Element(XmlElementRef),
    Texts(Vec<XmlTextRef>),
}

impl Current {
    fn span(&self) -> u32 {
        match self {
            Current::Element(_) => 1,
            Current::Texts(texts) => texts.len() as u32,
        }
    }

    fn to_nodes(&self, txn: &TransactionMut) -> Result<Vec<Node>> {
        match self {
            Current::Element(element) => Ok(vec![Node::Element(element_to_node(txn, element)?)]),
            Current::Texts(texts) => {
                let mut nodes = Vec::new();
                for text in texts {
                    nodes.extend(text_to_nodes(txn, text)?);
                }
                Ok(nodes)
            }
        }
    }
}

fn current_items<F: XmlFragment>(txn: &TransactionMut, parent: &F) -> Result<Vec<Current>> {
    let mut items: Vec<Current> = Vec::new();
    for index in 0..parent.len(txn) {
        match parent.get(txn, index) {
            Some(XmlOut::Element(element)) => items.push(Current::Element(element)),
            Some(XmlOut::Text(text)) => match items.last_mut() {
                Some(Current::Texts(run)) => run.push(text),
                _ => items.push(Current::Texts(vec![text])),
            },
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
    Ok(items)
}

/// Split desired siblings into single elements and maximal text runs.
fn desired_items(nodes: &[Node]) -> Vec<&[Node]> {
    let mut items = Vec::new();
    let mut start = 0;
    while start < nodes.len() {
        let len = if nodes[start].is_text() {
            nodes[start..].iter().take_while(|node| node.is_text()).count()
        } else {
            1
        };
        items.push(&nodes[start..start + len]);
        start += len;
    }
    items
}

fn same_kind(current: &Current, desired: &[Node]) -> bool {
    match (current, &desired[0]) {
        (Current::Element(element), Node::Element(node)) => {
            &**element.tag() == node.node_type.as_str()
        }
        (Current::Texts(_), Node::Text(_)) => true,
        _ => false,
    }
}

/// The desired node in the form serialization would produce for it.
fn normalized(node: &Node) -> Node {
    match node {
        Node::Text(text) => {
            // Ordered by the key the mark is stored under, before its values
            // are reshaped into their stored form.
            let mut keyed: Vec<(String, Mark)> = text
                .marks
                .iter()
                .map(|mark| (mark.encoded_key(), stored_mark(mark)))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            Node::Text(TextNode {
                text: text.text.clone(),
                marks: keyed.into_iter().map(|(_, mark)| mark).collect(),
            })
        }
        Node::Element(element) => Node::Element(ElementNode {
            node_type: element.node_type.clone(),
            attrs: element
                .attrs
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(attribute_string(value))))
                .collect(),
            marks: element.marks.clone(),
            content: element.content.iter().map(normalized).collect(),
        }),
    }
}

fn stored_mark(mark: &Mark) -> Mark {
    let attrs = mark
        .attrs
        .as_ref()
        .filter(|attrs| !attrs.is_empty())
        .and_then(|attrs| match stored_form(&Value::Object(attrs.clone())) {
            Value::Object(map) => Some(map),
            _ => None,
        });
    Mark {
        mark_type: mark.mark_type.clone(),
        attrs,
    }
}

// ===== PATCHING =====

fn update_attributes(
    txn: &mut TransactionMut,
    element: &XmlElementRef,
    desired: &ElementNode,
) -> Result<()> {
    let current = element_attributes(&*txn, element);
    let mut wanted: BTreeMap<String, String> = desired
        .attrs
        .iter()
        .map(|(key, value)| (key.clone(), attribute_string(value)))
        .collect();
    if let Some(marks) = &desired.marks {
        wanted.insert(MARKS_ATTRIBUTE.to_string(), serde_json::to_string(marks)?);
    }

    for (key, value) in &wanted {
        if current.get(key) != Some(value) {
            element.insert_attribute(txn, key.as_str(), value.clone());
        }
    }
    for key in current.keys() {
        if !wanted.contains_key(key) {
            element.remove_attribute(txn, key);
        }
    }
    Ok(())
}

/// Drop runs left empty by an update. Returns how many runs remain.
fn remove_empty_texts<F: XmlFragment>(
    txn: &mut TransactionMut,
    parent: &F,
    index: u32,
    texts: &[XmlTextRef],
) -> u32 {
    let mut kept = 0;
    for text in texts {
        if text.len(&*txn) == 0 {
            parent.remove_range(txn, index + kept, 1);
        } else {
            kept += 1;
        }
    }
    kept
}

/// Attributes to set so a chunk carrying `current` ends up with `wanted`.
/// Keys to drop are set to null.
fn format_patch(current: &Attrs, wanted: &Attrs) -> YAttrs {
    let mut patch = YAttrs::new();
    for (key, value) in wanted {
        if current.get(key) != Some(value) {
            patch.insert(key.as_str().into(), json_to_any(value));
        }
    }
    for key in current.keys() {
        if !wanted.contains_key(key) {
            patch.insert(key.as_str().into(), Any::Null);
        }
    }
    patch
}

// ===== DIFFING =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep(usize, usize),
    Remove(usize),
    Insert(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Unchanged(usize, usize),
    Update(usize, usize),
    Remove(usize),
    Insert(usize),
}

/// Longest common subsequence of two index ranges under `matches`.
///
/// Backtracking runs front to back and takes a match whenever one is optimal,
/// so among equivalent alignments the earliest candidates are paired.
fn align(n: usize, m: usize, matches: impl Fn(usize, usize) -> bool) -> Vec<Step> {
    let mut lengths = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if matches(i, j) {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if matches(i, j) {
            steps.push(Step::Keep(i, j));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            steps.push(Step::Remove(i));
            i += 1;
        } else {
            steps.push(Step::Insert(j));
            j += 1;
        }
    }
    steps.extend((i..n).map(Step::Remove));
    steps.extend((j..m).map(Step::Insert));
    steps
}

/// Two-pass alignment: `identical` anchors first, then `similar` inside the gaps.
///
/// Identical leading and trailing items are paired up front, so only the
/// changed middle pays for the quadratic alignment.
fn edit_script(
    n: usize,
    m: usize,
    identical: impl Fn(usize, usize) -> bool,
    similar: impl Fn(usize, usize) -> bool,
) -> Vec<Edit> {
    let prefix = (0..n.min(m)).take_while(|&k| identical(k, k)).count();
    let mut suffix = (0..n.min(m) - prefix)
        .take_while(|&k| identical(n - 1 - k, m - 1 - k))
        .count();
    // A trailing anchor gives way when an earlier current item could take it.
    while suffix > 0 && (prefix..n - suffix).any(|i| identical(i, m - suffix)) {
        suffix -= 1;
    }

    let mut edits: Vec<Edit> = (0..prefix).map(|k| Edit::Unchanged(k, k)).collect();
    edits.extend(
        middle_script(
            n - prefix - suffix,
            m - prefix - suffix,
            |i, j| identical(prefix + i, prefix + j),
            |i, j| similar(prefix + i, prefix + j),
        )
        .into_iter()
        .map(|edit| match edit {
            Edit::Unchanged(i, j) => Edit::Unchanged(prefix + i, prefix + j),
            Edit::Update(i, j) => Edit::Update(prefix + i, prefix + j),
            Edit::Remove(i) => Edit::Remove(prefix + i),
            Edit::Insert(j) => Edit::Insert(prefix + j),
        }),
    );
    edits.extend((0..suffix).rev().map(|k| Edit::Unchanged(n - 1 - k, m - 1 - k)));
    edits
}

fn middle_script(
    n: usize,
    m: usize,
    identical: impl Fn(usize, usize) -> bool,
    similar: impl Fn(usize, usize) -> bool,
) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(n + m);
    let mut gap_current = Vec::new();
    let mut gap_desired = Vec::new();

    let flush = |edits: &mut Vec<Edit>,
                 gap_current: &mut Vec<usize>,
                 gap_desired: &mut Vec<usize>| {
        let steps = align(gap_current.len(), gap_desired.len(), |a, b| {
            similar(gap_current[a], gap_desired[b])
        });
        edits.extend(steps.into_iter().map(|step| match step {
            Step::Keep(a, b) => Edit::Update(gap_current[a], gap_desired[b]),
            Step::Remove(a) => Edit::Remove(gap_current[a]),
            Step::Insert(b) => Edit::Insert(gap_desired[b]),
        }));
        gap_current.clear();
        gap_desired.clear();
    };

    for step in align(n, m, identical) {
        match step {
            Step::Keep(i, j) => {
                flush(&mut edits, &mut gap_current, &mut gap_desired);
                edits.push(Edit::Unchanged(i, j));
            }
            Step::Remove(i) => gap_current.push(i),
            Step::Insert(j) => gap_desired.push(j),
        }
    }
    flush(&mut edits, &mut gap_current, &mut gap_desired);
    edits
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// The part of `span` inside `window`, relative to `window.start`.
fn overlap(span: &Range<usize>, window: Range<usize>) -> Option<Range<usize>> {
    let start = span.start.max(window.start);
    let end = span.end.min(window.end);
    (start < end).then(|| start - window.start..end - window.start)
}

/// Which run, and which character within it, receives text inserted at
/// `position` of the concatenated runs. Inserts extend the run holding the
/// preceding character.
fn insertion_point(runs: &[Vec<char>], position: usize) -> (usize, usize) {
    let mut start = 0;
    for (i, run) in runs.iter().enumerate() {
        let end = start + run.len();
        if position > start && position <= end {
            return (i, position - start);
        }
        start = end;
    }
    if position == 0 || runs.is_empty() {
        return (0, 0);
    }
    let last = runs.len() - 1;
    (last, runs[last].len())
}
