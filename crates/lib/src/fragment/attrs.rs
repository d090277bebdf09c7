//! Attribute and chunk plumbing between `yrs` values and JSON.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64ct::{Base64, Encoding};
use serde_json::{Number, Value};
use yrs::types::Attrs as YAttrs;
use yrs::types::text::YChange;
use yrs::{Any, OffsetKind, Out, ReadTxn, Text, Xml, XmlElementRef, XmlTextRef};

use super::errors::FragmentError;
use crate::mark::{Attrs, Mark};

/// Largest integer an IEEE double holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// One attributed chunk of a text run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Chunk {
    pub text: String,
    pub attrs: Attrs,
}

impl Chunk {
    /// The chunk a ProseMirror text node is written as.
    ///
    /// Values are in the form they read back in, so a desired chunk compares
    /// equal to the stored one.
    pub fn from_marks(text: &str, marks: &[Mark]) -> Self {
        Self {
            text: text.to_string(),
            attrs: marks
                .iter()
                .map(|mark| (mark.encoded_key(), stored_form(&mark.encoded_value())))
                .collect(),
        }
    }

    /// Marks of the chunk, ordered by attribute key.
    pub fn marks(&self) -> Result<Vec<Mark>, FragmentError> {
        self.attrs
            .iter()
            .map(|(key, value)| {
                Mark::from_attribute(key, value)
                    .ok_or_else(|| FragmentError::InvalidMarkValue { key: key.clone() })
            })
            .collect()
    }
}

/// Read a text run as its sequence of attributed chunks.
pub(crate) fn read_chunks<T: ReadTxn>(
    txn: &T,
    text: &XmlTextRef,
) -> Result<Vec<Chunk>, FragmentError> {
    text.diff(txn, YChange::identity)
        .into_iter()
        .enumerate()
        .map(|(chunk, diff)| {
            let content = match diff.insert {
                Out::Any(Any::String(content)) => content.to_string(),
                _ => return Err(FragmentError::UnsupportedEmbed { chunk }),
            };
            let attrs = diff
                .attributes
                .map(|attrs| {
                    attrs
                        .iter()
                        .map(|(key, value)| (key.to_string(), any_to_json(value)))
                        .collect::<BTreeMap<_, _>>()
                        .into_iter()
                        .collect::<Attrs>()
                })
                .unwrap_or_default();
            Ok(Chunk {
                text: content,
                attrs,
            })
        })
        .collect()
}

/// All attributes of an element, as strings.
pub(crate) fn element_attributes<T: ReadTxn>(
    txn: &T,
    element: &XmlElementRef,
) -> BTreeMap<String, String> {
    element
        .attributes(txn)
        .map(|(name, value)| (name.to_string(), out_to_string(value, txn)))
        .collect()
}

fn out_to_string<T: ReadTxn>(value: Out, txn: &T) -> String {
    match value {
        Out::Any(Any::String(s)) => s.to_string(),
        other => other.to_string(txn),
    }
}

/// String form of a JSON element attribute.
///
/// Strings are kept verbatim, `null` becomes the empty string and anything
/// else is written as compact JSON.
pub(crate) fn attribute_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a JSON attribute map to `yrs` text attributes.
pub(crate) fn to_yattrs(attrs: &Attrs) -> YAttrs {
    attrs
        .iter()
        .map(|(key, value)| (Arc::<str>::from(key.as_str()), json_to_any(value)))
        .collect()
}

/// `value` as it reads back after a trip through the document.
pub(crate) fn stored_form(value: &Value) -> Value {
    any_to_json(&json_to_any(value))
}

pub(crate) fn json_to_any(value: &Value) -> Any {
    match value {
        Value::Null => Any::Null,
        Value::Bool(b) => Any::Bool(*b),
        Value::Number(n) => Any::Number(n.as_f64().unwrap_or_default()),
        Value::String(s) => Any::String(s.as_str().into()),
        Value::Array(items) => {
            Any::Array(items.iter().map(json_to_any).collect::<Vec<_>>().into())
        }
        Value::Object(map) => Any::Map(Arc::new(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_any(value)))
                .collect::<HashMap<_, _>>(),
        )),
    }
}

/// Convert a stored `yrs` value to JSON.
///
/// Whole numbers within the safe-integer range come back as JSON integers,
/// the way a JavaScript peer would print them. Binary buffers become base64
/// strings. Map keys come out sorted.
pub(crate) fn any_to_json(any: &Any) -> Value {
    match any {
        Any::Null | Any::Undefined => Value::Null,
        Any::Bool(b) => Value::Bool(*b),
        Any::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            Value::from(*n as i64)
        }
        Any::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Any::BigInt(i) => Value::from(*i),
        Any::String(s) => Value::String(s.to_string()),
        Any::Buffer(bytes) => Value::String(Base64::encode_string(bytes)),
        Any::Array(items) => Value::Array(items.iter().map(any_to_json).collect()),
        Any::Map(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), any_to_json(value)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect(),
        ),
    }
}

/// Length of `chars` in the document's text offset units.
pub(crate) fn unit_len(chars: &[char], kind: OffsetKind) -> u32 {
    let len: usize = match kind {
        OffsetKind::Bytes => chars.iter().map(|c| c.len_utf8()).sum(),
        OffsetKind::Utf16 => chars.iter().map(|c| c.len_utf16()).sum(),
        #[allow(unreachable_patterns)]
        _ => chars.len(),
    };
    len as u32
}
