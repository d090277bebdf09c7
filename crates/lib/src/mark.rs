//! Mark-name codec.
//!
//! Text attributes in a Y-CRDT are a flat map: one value per attribute name.
//! ProseMirror marks are typed and may carry their own attribute payload, so two
//! `link` marks with different `href`s need different attribute names. Marks
//! without attributes keep their bare type as the key; marks with attributes get
//! a short hash of their attributes appended:
//!
//! ```text
//! bold                 (no attributes)
//! link--Zm9vYmFy       (type, "--", 8 base64 characters)
//! ```
//!
//! Decoding only recovers the type. The attributes travel as the attribute
//! value next to the key.
//!
//! Any externally written attribute key matching the suffix grammar will be
//! read as an encoded mark. Such keys are outside this crate's namespace.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::constants::{MARK_HASH_BYTES, MARK_HASH_SEPARATOR, MARK_HASH_SUFFIX_LEN};

/// Attribute payload of a mark or node.
pub type Attrs = Map<String, Value>;

/// A ProseMirror mark: `{"type": ..., "attrs": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl Mark {
    /// Create a mark without attributes.
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs: None,
        }
    }

    /// Add one attribute to the mark.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// The text-attribute key this mark is stored under.
    pub fn encoded_key(&self) -> String {
        encode_mark_name(&self.mark_type, self.attrs.as_ref())
    }

    /// The text-attribute value this mark is stored with.
    ///
    /// Bare marks are stored as an empty object.
    pub fn encoded_value(&self) -> Value {
        Value::Object(self.attrs.clone().unwrap_or_default())
    }

    /// Rebuild a mark from a stored text attribute.
    ///
    /// `true` is the flag form other Yjs editors use for formats such as
    /// `bold` and reads as a bare mark. Any other scalar or array carries a
    /// payload that mark attributes cannot hold, so `None` is returned rather
    /// than dropping it.
    pub fn from_attribute(key: &str, value: &Value) -> Option<Self> {
        let attrs = match value {
            Value::Null | Value::Bool(true) => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(map.clone()),
            _ => return None,
        };
        Some(Self {
            mark_type: decode_mark_name(key).to_string(),
            attrs,
        })
    }
}

/// Encode a mark type and its attributes into a single attribute key.
///
/// Marks without attributes return `mark_type` unchanged. Otherwise the
/// attributes are serialized as compact JSON in their own key order, hashed
/// with SHA-256, and the digest is folded to 6 bytes by XOR-ing byte `i` into
/// byte `i % 6`. The base64 encoding of those bytes becomes the suffix.
///
/// The fold is not collision resistant. Two attribute sets may share a suffix.
///
/// # Examples
///
/// ```
/// # use yprose::mark::encode_mark_name;
/// assert_eq!(encode_mark_name("bold", None), "bold");
///
/// let attrs = serde_json::json!({"href": "https://example.com"});
/// let key = encode_mark_name("link", attrs.as_object());
/// assert!(key.starts_with("link--"));
/// assert_eq!(key.len(), "link--".len() + 8);
/// ```
pub fn encode_mark_name(mark_type: &str, attrs: Option<&Attrs>) -> String {
    let attrs = match attrs {
        Some(attrs) if !attrs.is_empty() => attrs,
        _ => return mark_type.to_string(),
    };

    let json = Value::Object(attrs.clone()).to_string();
    let digest = Sha256::digest(json.as_bytes());

    let mut folded = [0u8; MARK_HASH_BYTES];
    folded.copy_from_slice(&digest[..MARK_HASH_BYTES]);
    for (i, byte) in digest.iter().enumerate().skip(MARK_HASH_BYTES) {
        folded[i % MARK_HASH_BYTES] ^= byte;
    }

    format!(
        "{mark_type}{MARK_HASH_SEPARATOR}{}",
        Base64::encode_string(&folded)
    )
}

/// Recover the mark type from an attribute key.
///
/// Strips a trailing `--` followed by exactly 8 base64 characters when at least
/// one character precedes it. Keys that don't match are returned unchanged, so
/// `my-mark--short` stays as it is.
///
/// ```
/// # use yprose::mark::decode_mark_name;
/// assert_eq!(decode_mark_name("link--ABCD1234"), "link");
/// assert_eq!(decode_mark_name("text-style--ABCD1234"), "text-style");
/// assert_eq!(decode_mark_name("my-mark--short"), "my-mark--short");
/// ```
pub fn decode_mark_name(key: &str) -> &str {
    match split_encoded(key) {
        Some((mark_type, _)) => mark_type,
        None => key,
    }
}

/// Whether `key` has the shape of an encoded mark with attributes.
pub fn is_encoded_mark_name(key: &str) -> bool {
    split_encoded(key).is_some()
}

fn split_encoded(key: &str) -> Option<(&str, &str)> {
    let suffix_start = key.len().checked_sub(MARK_HASH_SUFFIX_LEN)?;
    let prefix_end = suffix_start.checked_sub(MARK_HASH_SEPARATOR.len())?;
    if prefix_end == 0 {
        return None;
    }

    let bytes = key.as_bytes();
    if !bytes[suffix_start..].iter().all(|b| is_base64_byte(*b)) {
        return None;
    }
    if &bytes[prefix_end..suffix_start] != MARK_HASH_SEPARATOR.as_bytes() {
        return None;
    }

    // The tail is ASCII, so both offsets are on char boundaries.
    Some((&key[..prefix_end], &key[suffix_start..]))
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}
