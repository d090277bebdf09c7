//! Reconciler tests: resulting content, edit-script shape and merge behavior.

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use yprose::ReconcileStats;
use yprose::fragment::{self, Reconciler};
use yprose::y_crdt::types::text::YChange;
use yprose::y_crdt::{Doc, OffsetKind, Text, Transact, XmlElementPrelim, XmlFragment, XmlOut};

use crate::helpers::*;

/// Build `from`, reconcile toward `to`, and check the result.
fn reconcile_case(from: &Value, to: &Value) -> ReconcileStats {
    let replica = built(from);
    let stats = replica.reconcile_json(to).expect("Failed to reconcile");
    assert_content(&replica, to);
    stats
}

// ===== RESULTING CONTENT =====

#[test]
fn test_text_edit_in_the_middle() {
    reconcile_case(
        &doc(vec![paragraph("Hello world")]),
        &doc(vec![paragraph("Hello brave new world")]),
    );
}

#[test]
fn test_text_replaced_entirely() {
    reconcile_case(
        &doc(vec![paragraph("Hello")]),
        &doc(vec![paragraph("Updated")]),
    );
}

#[test]
fn test_add_and_remove_marks() {
    let plain = doc(vec![paragraph("Hello world")]);
    let bold = doc(vec![paragraph_with(vec![
        text("Hello "),
        marked("world", json!([{"type": "bold"}])),
    ])]);
    reconcile_case(&plain, &bold);
    reconcile_case(&bold, &plain);
}

#[test]
fn test_change_mark_attributes() {
    reconcile_case(
        &doc(vec![paragraph_with(vec![marked(
            "site",
            json!([{"type": "link", "attrs": {"href": "https://a.com"}}]),
        )])]),
        &doc(vec![paragraph_with(vec![marked(
            "site",
            json!([{"type": "link", "attrs": {"href": "https://b.com"}}]),
        )])]),
    );
}

#[test]
fn test_insert_marked_text_between_plain_text() {
    reconcile_case(
        &doc(vec![paragraph("ac")]),
        &doc(vec![paragraph_with(vec![
            text("a"),
            marked("b", json!([{"type": "italic"}])),
            text("c"),
        ])]),
    );
}

#[test]
fn test_element_attributes_change_in_place() {
    let from = doc(vec![json!({
        "type": "heading",
        "attrs": {"level": "1", "id": "top"},
        "content": [{"type": "text", "text": "Title"}]
    })]);
    let to = doc(vec![json!({
        "type": "heading",
        "attrs": {"level": "2"},
        "content": [{"type": "text", "text": "Title"}]
    })]);
    let stats = reconcile_case(&from, &to);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.inserted + stats.removed, 0);
}

#[test]
fn test_element_marks_change_in_place() {
    let from = doc(vec![json!({"type": "image", "attrs": {"src": "a.png"}})]);
    let to = doc(vec![json!({
        "type": "image",
        "attrs": {"src": "a.png"},
        "marks": [{"type": "link", "attrs": {"href": "https://example.com"}}]
    })]);
    let stats = reconcile_case(&from, &to);
    assert_eq!(stats.updated, 1);
    reconcile_case(&to, &from);
}

#[test]
fn test_element_type_change_replaces_element() {
    let stats = reconcile_case(
        &doc(vec![paragraph("Title")]),
        &doc(vec![json!({"type": "heading", "content": [{"type": "text", "text": "Title"}]})]),
    );
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.inserted, 1);
}

#[test]
fn test_insert_remove_and_reorder_blocks() {
    reconcile_case(
        &doc(vec![paragraph("a"), paragraph("b"), paragraph("c")]),
        &doc(vec![paragraph("c"), paragraph("a"), paragraph("d")]),
    );
}

#[test]
fn test_nested_changes() {
    reconcile_case(
        &doc(vec![json!({
            "type": "blockquote",
            "content": [paragraph("Quoted"), paragraph("Kept")]
        })]),
        &doc(vec![json!({
            "type": "blockquote",
            "content": [paragraph("Quoted text"), paragraph("Kept"), paragraph("Added")]
        })]),
    );
}

#[test]
fn test_to_and_from_empty() {
    let full = doc(vec![paragraph("one"), json!({"type": "horizontal_rule"})]);
    let empty = doc(vec![]);
    reconcile_case(&empty, &full);
    reconcile_case(&full, &empty);
}

#[test]
fn test_clearing_a_paragraph_removes_its_text() {
    let stats = reconcile_case(
        &doc(vec![paragraph("gone")]),
        &doc(vec![json!({"type": "paragraph"})]),
    );
    assert_eq!(stats.removed, 1);
}

#[test]
fn test_non_ascii_text_with_each_offset_kind() {
    for kind in [OffsetKind::Bytes, OffsetKind::Utf16] {
        let replica = replica_with_offsets(kind);
        replica
            .build_json(&doc(vec![paragraph("naïve 😀 café")]))
            .unwrap();
        let to = doc(vec![paragraph_with(vec![
            text("naïve 🎉 "),
            marked("café", json!([{"type": "bold"}])),
            text(" ✓"),
        ])]);
        replica.reconcile_json(&to).unwrap();
        assert_content(&replica, &to);
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let json = doc(vec![
        paragraph_with(vec![text("a "), marked("b", json!([{"type": "bold"}]))]),
        json!({"type": "heading", "attrs": {"level": "1"}, "content": [{"type": "text", "text": "h"}]}),
    ]);
    let replica = built(&json);
    let before = replica.state_vector();

    let stats = replica.reconcile_json(&json).unwrap();
    assert_eq!(
        stats,
        ReconcileStats {
            unchanged: 2,
            ..Default::default()
        }
    );
    assert_eq!(replica.state_vector(), before);
}

#[test]
fn test_reconcile_is_idempotent_for_ordered_and_float_mark_attributes() {
    let json = doc(vec![paragraph_with(vec![
        marked(
            "site",
            json!([{"type": "link", "attrs": {"href": "https://x.com", "target": "_blank", "rel": "noopener"}}]),
        ),
        marked("wide", json!([{"type": "highlight", "attrs": {"w": 2.0}}])),
    ])]);
    let replica = built(&json);
    let before = replica.state_vector();

    let stats = replica.reconcile_json(&json).unwrap();
    assert_eq!(
        stats,
        ReconcileStats {
            unchanged: 1,
            ..Default::default()
        }
    );
    assert_eq!(replica.state_vector(), before);
}

#[test]
fn test_link_marks_are_stored_under_insertion_order_keys() {
    let replica = built(&doc(vec![paragraph_with(vec![marked(
        "site",
        json!([{"type": "link", "attrs": {"href": "https://x.com", "target": "_blank", "rel": "noopener"}}]),
    )])]));
    let txn = replica.doc().transact();
    let Some(XmlOut::Element(p)) = replica.fragment().get(&txn, 0) else {
        panic!("expected a paragraph");
    };
    let Some(XmlOut::Text(run)) = p.get(&txn, 0) else {
        panic!("expected a text run");
    };
    let mut keys = Vec::new();
    for chunk in run.diff(&txn, YChange::identity) {
        if let Some(attrs) = chunk.attributes {
            keys.extend(attrs.keys().map(|key| key.to_string()));
        }
    }
    assert_eq!(keys, vec!["link--ThOwJYoy".to_string()]);
}

#[test]
fn test_one_block_edit_in_a_large_document() {
    let paragraphs: Vec<Value> = (0..5000)
        .map(|i| paragraph(&format!("Paragraph {i}")))
        .collect();
    let replica = built(&doc(paragraphs.clone()));

    let mut edited = paragraphs;
    edited[2500] = paragraph("Paragraph 2500, edited");
    let started = Instant::now();
    let stats = replica.reconcile_json(&doc(edited.clone())).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stats.unchanged, 4999);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.inserted + stats.removed, 0);
    assert!(elapsed < Duration::from_secs(4), "reconcile took {elapsed:?}");
    assert_content(&replica, &doc(edited));
}

#[test]
fn test_reconcile_into_element_subtree() {
    let ydoc = Doc::new();
    let root = ydoc.get_or_insert_xml_fragment("body");
    let mut txn = ydoc.transact_mut();
    let section = root.push_back(&mut txn, XmlElementPrelim::empty("section"));
    fragment::json_to_fragment(&mut txn, &section, &doc(vec![paragraph("one")])).unwrap();

    fragment::update_fragment(
        &mut txn,
        &section,
        &doc(vec![paragraph("one"), paragraph("two")]),
        OffsetKind::Bytes,
    )
    .unwrap();

    assert_eq!(
        fragment::fragment_to_json(&txn, &section).unwrap(),
        doc(vec![paragraph("one"), paragraph("two")])
    );
}

#[test]
fn test_invalid_document_is_rejected_before_writing() {
    let replica = built(&doc(vec![paragraph("keep")]));
    let before = replica.state_vector();
    let err = replica
        .reconcile_json(&json!({"type": "doc", "content": [{"type": ""}]}))
        .unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(replica.state_vector(), before);
}

// ===== TIE-BREAKS =====

#[test]
fn test_unchanged_siblings_are_untouched() {
    let stats = reconcile_case(
        &doc(vec![paragraph("a"), paragraph("b"), paragraph("c")]),
        &doc(vec![paragraph("a"), paragraph("B"), paragraph("c")]),
    );
    // The paragraph and its text group are each patched in place.
    assert_eq!(
        stats,
        ReconcileStats {
            unchanged: 2,
            updated: 2,
            removed: 0,
            inserted: 0,
        }
    );
}

#[test]
fn test_duplicate_siblings_keep_the_first() {
    let a = built(&doc(vec![paragraph("x"), paragraph("x")]));
    let b = replica();
    sync_into(&a, &b);

    // An edit inside the second paragraph only survives if that paragraph does.
    b.reconcile_json(&doc(vec![paragraph("x"), paragraph("x!")]))
        .unwrap();
    let stats = a.reconcile_json(&doc(vec![paragraph("x")])).unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.removed, 1);

    sync_into(&b, &a);
    sync_into(&a, &b);
    assert_content(&a, &doc(vec![paragraph("x")]));
    assert_content(&b, &doc(vec![paragraph("x")]));
}

#[test]
fn test_exact_match_wins_over_position() {
    // Dropping the first paragraph must not rewrite the second into the first.
    let stats = reconcile_case(
        &doc(vec![paragraph("first"), paragraph("second")]),
        &doc(vec![paragraph("second")]),
    );
    assert_eq!(
        stats,
        ReconcileStats {
            unchanged: 1,
            updated: 0,
            removed: 1,
            inserted: 0,
        }
    );
}

#[test]
fn test_reconciler_on_raw_transaction() {
    let replica = built(&doc(vec![paragraph("raw")]));
    let reconciler = Reconciler::new(replica.config().offset_kind);
    let target = yprose::Document::from_value(doc(vec![paragraph("raw text")])).unwrap();
    {
        let mut txn = replica.doc().transact_mut();
        reconciler
            .reconcile(&mut txn, replica.fragment(), &target)
            .unwrap();
    }
    assert_eq!(replica.to_document().unwrap(), target);
}

// ===== MERGE BEHAVIOR =====

#[test]
fn test_reconcile_delta_merges_with_concurrent_edits() {
    let a = built(&doc(vec![paragraph("Hello"), paragraph("World")]));
    let b = replica();
    sync_into(&a, &b);

    // Both replicas edit concurrently, each in a different paragraph.
    a.reconcile_json(&doc(vec![paragraph("Hello there"), paragraph("World")]))
        .unwrap();
    b.reconcile_json(&doc(vec![paragraph("Hello"), paragraph("World!")]))
        .unwrap();

    sync_into(&a, &b);
    sync_into(&b, &a);

    let merged = doc(vec![paragraph("Hello there"), paragraph("World!")]);
    assert_content(&a, &merged);
    assert_content(&b, &merged);
}

#[test]
fn test_concurrent_edits_in_the_same_text_both_survive() {
    let a = built(&doc(vec![paragraph("The fox")]));
    let b = replica();
    sync_into(&a, &b);

    a.reconcile_json(&doc(vec![paragraph("The quick fox")])).unwrap();
    b.reconcile_json(&doc(vec![paragraph("The fox jumps")])).unwrap();

    sync_into(&a, &b);
    sync_into(&b, &a);

    let expected = doc(vec![paragraph("The quick fox jumps")]);
    assert_content(&a, &expected);
    assert_content(&b, &expected);
}

#[test]
fn test_delta_is_incremental() {
    let paragraphs: Vec<Value> = (0..50)
        .map(|i| paragraph(&format!("Paragraph number {i} with some filler text")))
        .collect();
    let replica = built(&doc(paragraphs.clone()));
    let full = replica.encode_state();
    let before = replica.state_vector();

    let mut edited = paragraphs;
    edited[25] = paragraph("Paragraph number 25 with some edited filler text");
    replica.reconcile_json(&doc(edited.clone())).unwrap();

    let delta = replica.diff(&before).unwrap();
    assert!(
        delta.len() * 10 < full.len(),
        "delta ({} bytes) should be much smaller than the full state ({} bytes)",
        delta.len(),
        full.len()
    );
    assert_content(&replica, &doc(edited));
}
