//! Error types for converting between XML fragments and documents.

use thiserror::Error;

/// Errors raised when a CRDT tree cannot be represented as a ProseMirror document.
///
/// Nothing is silently dropped: a child, chunk or attribute without a
/// ProseMirror counterpart fails the whole conversion.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FragmentError {
    /// A child of a kind that has no ProseMirror counterpart
    #[error("Unsupported {kind} child at index {index}")]
    UnsupportedChild { index: u32, kind: String },

    /// A text run containing a non-string embed
    #[error("Text run contains a non-text embed in chunk {chunk}")]
    UnsupportedEmbed { chunk: usize },

    /// The reserved `marks` element attribute is not a JSON array of marks
    #[error("Element '{tag}' has an invalid 'marks' attribute: {reason}")]
    InvalidElementMarks { tag: String, reason: String },

    /// A text attribute value that cannot be a mark payload
    #[error("Text attribute '{key}' does not hold a mark payload")]
    InvalidMarkValue { key: String },
}

impl FragmentError {
    /// Check if this error comes from tree content with no JSON counterpart
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            FragmentError::UnsupportedChild { .. } | FragmentError::UnsupportedEmbed { .. }
        )
    }

    /// Check if this error comes from mark data stored in the tree
    pub fn is_mark_error(&self) -> bool {
        matches!(
            self,
            FragmentError::InvalidElementMarks { .. } | FragmentError::InvalidMarkValue { .. }
        )
    }
}

impl From<FragmentError> for crate::Error {
    fn from(err: FragmentError) -> Self {
        crate::Error::Fragment(err)
    }
}
