use serde_json::{Value, json};
use yprose::y_crdt::OffsetKind;
use yprose::{Replica, ReplicaConfig};

// ==========================
// DOCUMENT FACTORIES
// ==========================

/// Wrap `content` in a `doc` node.
pub fn doc(content: Vec<Value>) -> Value {
    json!({"type": "doc", "content": content})
}

/// A paragraph holding one unmarked text node.
pub fn paragraph(text: &str) -> Value {
    json!({"type": "paragraph", "content": [{"type": "text", "text": text}]})
}

/// A paragraph holding the given inline nodes.
pub fn paragraph_with(content: Vec<Value>) -> Value {
    json!({"type": "paragraph", "content": content})
}

pub fn text(text: &str) -> Value {
    json!({"type": "text", "text": text})
}

pub fn marked(text: &str, marks: Value) -> Value {
    json!({"type": "text", "text": text, "marks": marks})
}

// ==========================
// REPLICA FACTORIES
// ==========================

pub fn replica() -> Replica {
    Replica::new(ReplicaConfig::default())
}

pub fn replica_with_offsets(offset_kind: OffsetKind) -> Replica {
    Replica::new(ReplicaConfig::default().with_offset_kind(offset_kind))
}

/// A replica that keeps deleted content, so snapshots can be restored.
pub fn archival_replica() -> Replica {
    Replica::new(ReplicaConfig::default().with_skip_gc(true))
}

/// A fresh replica populated from `json`.
pub fn built(json: &Value) -> Replica {
    let replica = replica();
    replica.build_json(json).expect("Failed to build document");
    replica
}

/// Send everything `to` is missing from `from`.
pub fn sync_into(from: &Replica, to: &Replica) {
    let update = from
        .diff(&to.state_vector())
        .expect("Failed to encode diff");
    to.sync(&update).expect("Failed to apply diff");
}

/// Build `json` into a fresh replica and serialize it back.
pub fn round_trip(json: &Value) -> Value {
    built(json).to_json().expect("Failed to serialize document")
}

// ==========================
// ASSERTION HELPERS
// ==========================

/// Merge adjacent text nodes with equal marks and drop empty ones.
///
/// A text run may be split into several chunks with identical formatting
/// after edits; the visible content is the same either way.
pub fn normalize(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };
    let mut object = object.clone();
    if let Some(Value::Array(children)) = object.get("content") {
        let mut merged: Vec<Value> = Vec::new();
        for child in children.iter().map(normalize) {
            if child["type"] == "text" && child["text"] == "" {
                continue;
            }
            match merged.last_mut() {
                Some(last)
                    if last["type"] == "text"
                        && child["type"] == "text"
                        && last.get("marks") == child.get("marks") =>
                {
                    let joined = format!(
                        "{}{}",
                        last["text"].as_str().unwrap_or_default(),
                        child["text"].as_str().unwrap_or_default()
                    );
                    last["text"] = Value::String(joined);
                }
                _ => merged.push(child),
            }
        }
        if merged.is_empty() && object.get("type").and_then(Value::as_str) != Some("doc") {
            object.remove("content");
        } else {
            object.insert("content".to_string(), Value::Array(merged));
        }
    }
    Value::Object(object)
}

/// Assert the replica holds `expected`, up to chunk boundaries.
pub fn assert_content(replica: &Replica, expected: &Value) {
    let actual = replica.to_json().expect("Failed to serialize document");
    assert_eq!(normalize(&actual), normalize(expected));
}
