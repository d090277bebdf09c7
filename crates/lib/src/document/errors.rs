//! Error types for the ProseMirror document model.

use thiserror::Error;

/// Errors raised while reading a ProseMirror JSON document.
///
/// `path` locates the offending node from the document root, for example
/// `content[0].content[2]`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The node has no `type`, or `type` is not a string
    #[error("Node at '{path}' is missing a string 'type' field")]
    MissingType { path: String },

    /// The node's `type` is the empty string
    #[error("Node at '{path}' has an empty 'type'")]
    EmptyType { path: String },

    /// A field that the node kind cannot carry
    #[error("Node at '{path}' of type '{node_type}' cannot carry field '{field}'")]
    UnexpectedField {
        path: String,
        node_type: String,
        field: String,
    },

    /// The root node is not a `doc`
    #[error("Document root has type '{node_type}', expected 'doc'")]
    UnexpectedRoot { node_type: String },

    /// The JSON does not have the document shape at all
    #[error("Malformed document: {reason}")]
    Malformed { reason: String },
}

impl DocumentError {
    /// Check if this error is about a missing, empty or misplaced node type
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            DocumentError::MissingType { .. }
                | DocumentError::EmptyType { .. }
                | DocumentError::UnexpectedRoot { .. }
        )
    }

    /// Check if this error is about structurally invalid JSON
    pub fn is_malformed(&self) -> bool {
        matches!(self, DocumentError::Malformed { .. })
    }

    /// Get the node path if this error points at a node
    pub fn path(&self) -> Option<&str> {
        match self {
            DocumentError::MissingType { path }
            | DocumentError::EmptyType { path }
            | DocumentError::UnexpectedField { path, .. } => Some(path),
            DocumentError::UnexpectedRoot { .. } => Some("$"),
            DocumentError::Malformed { .. } => None,
        }
    }
}

impl From<DocumentError> for crate::Error {
    fn from(err: DocumentError) -> Self {
        crate::Error::Document(err)
    }
}
