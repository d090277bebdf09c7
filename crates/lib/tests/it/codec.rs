//! Mark-name codec tests.

use serde_json::json;
use yprose::Mark;
use yprose::mark::{decode_mark_name, encode_mark_name, is_encoded_mark_name};

#[test]
fn test_encode_is_deterministic() {
    let attrs = json!({"href": "https://example.com", "target": "_blank"});
    let first = encode_mark_name("link", attrs.as_object());
    for _ in 0..10 {
        assert_eq!(encode_mark_name("link", attrs.as_object()), first);
    }
}

#[test]
fn test_encode_matches_known_keys() {
    let link = json!({"href": "https://example.com"});
    assert_eq!(encode_mark_name("link", link.as_object()), "link--y4++mtit");

    // ProseMirror link marks list their attributes in schema order, not sorted.
    let link = json!({"href": "https://x.com", "target": "_blank", "rel": "noopener"});
    assert_eq!(encode_mark_name("link", link.as_object()), "link--ThOwJYoy");
}

#[test]
fn test_encode_follows_attribute_order() {
    let forward = json!({"href": "https://example.com", "title": "Example"});
    let backward = json!({"title": "Example", "href": "https://example.com"});
    assert_ne!(
        encode_mark_name("link", forward.as_object()),
        encode_mark_name("link", backward.as_object())
    );
}

#[test]
fn test_parsed_mark_keeps_attribute_order() {
    let mark: Mark = serde_json::from_str(
        r#"{"type": "link", "attrs": {"href": "https://x.com", "target": "_blank", "rel": "noopener"}}"#,
    )
    .unwrap();
    assert_eq!(mark.encoded_key(), "link--ThOwJYoy");
}

#[test]
fn test_encode_distinguishes_attribute_values() {
    let a = json!({"href": "https://a.com"});
    let b = json!({"href": "https://b.com"});
    assert_ne!(
        encode_mark_name("link", a.as_object()),
        encode_mark_name("link", b.as_object())
    );
}

#[test]
fn test_bare_marks_keep_their_name() {
    let empty = serde_json::Map::new();
    assert_eq!(encode_mark_name("bold", None), "bold");
    assert_eq!(encode_mark_name("bold", Some(&empty)), "bold");
}

#[test]
fn test_encoded_key_shape() {
    let attrs = json!({"color": "red"});
    let key = encode_mark_name("text-style", attrs.as_object());
    let (prefix, suffix) = key.split_at(key.len() - 8);
    assert_eq!(prefix, "text-style--");
    assert!(
        suffix
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    );
    assert!(is_encoded_mark_name(&key));
}

#[test]
fn test_decode_strips_only_valid_suffixes() {
    assert_eq!(decode_mark_name("link--ABCD1234"), "link");
    assert_eq!(decode_mark_name("my-mark--short"), "my-mark--short");
    assert_eq!(decode_mark_name("text-style--ABCD1234"), "text-style");
    assert_eq!(decode_mark_name("bold"), "bold");
    assert_eq!(decode_mark_name("--ABCD1234"), "--ABCD1234");
    assert_eq!(decode_mark_name("link--ABCD12!4"), "link--ABCD12!4");
}

#[test]
fn test_decode_recovers_encoded_type() {
    let attrs = json!({"href": "https://example.com"});
    for mark_type in ["link", "text-style", "a--b"] {
        let key = encode_mark_name(mark_type, attrs.as_object());
        assert_eq!(decode_mark_name(&key), mark_type);
    }
}

#[test]
fn test_mark_round_trips_through_attribute() {
    let link = Mark::new("link").with_attr("href", "https://example.com");
    let restored = Mark::from_attribute(&link.encoded_key(), &link.encoded_value());
    assert_eq!(restored, Some(link));

    let bold = Mark::new("bold");
    assert_eq!(bold.encoded_key(), "bold");
    assert_eq!(
        Mark::from_attribute("bold", &bold.encoded_value()),
        Some(bold)
    );
}
