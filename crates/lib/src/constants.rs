//! Constants used throughout the yprose library.
//!
//! This module provides central definitions for the reserved names of the
//! ProseMirror JSON shape and the attribute-key grammar of encoded marks.

/// `type` of the root node of every ProseMirror document.
pub const DOC_TYPE: &str = "doc";

/// `type` of ProseMirror text nodes.
pub const TEXT_TYPE: &str = "text";

/// Reserved element attribute carrying the JSON-encoded marks of a non-text node.
pub const MARKS_ATTRIBUTE: &str = "marks";

/// Separator between a mark type and its attribute hash.
pub const MARK_HASH_SEPARATOR: &str = "--";

/// Number of digest bytes kept after folding the SHA-256 digest.
pub const MARK_HASH_BYTES: usize = 6;

/// Length of the base64 suffix produced from [`MARK_HASH_BYTES`] bytes.
pub const MARK_HASH_SUFFIX_LEN: usize = 8;

/// Name of the shared XML fragment used when none is configured.
pub const DEFAULT_FRAGMENT: &str = "prosemirror";
