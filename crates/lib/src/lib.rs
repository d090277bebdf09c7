//!
//! yprose: ProseMirror documents on top of a Y-CRDT XML fragment.
//! This library converts between ProseMirror JSON and the shared XML tree that
//! Yjs-compatible collaborative editors replicate.
//!
//! ## Core Concepts
//!
//! * **Documents (`document::Document`)**: The typed ProseMirror JSON side: a `doc`
//!   root holding element nodes and text nodes with marks.
//! * **Mark codec (`mark`)**: Packs a mark type and its attributes into one text
//!   attribute key, so distinct marks of the same type can coexist on a text run.
//! * **Fragments (`fragment`)**: Conversion against any `yrs` XML fragment:
//!     * **serialize**: Reads the tree into a `Document`.
//!     * **build**: Appends a `Document` to an empty or existing tree.
//!     * **Reconciler**: Updates a populated tree in place with a minimal edit
//!       script, keeping untouched content so concurrent edits merge cleanly.
//! * **Replicas (`replica::Replica`)**: A `yrs` document with its fragment,
//!   plus v1 state exchange and snapshots.

pub mod config;
pub mod constants;
pub mod document;
pub mod fragment;
pub mod mark;
pub mod replica;

pub use config::ReplicaConfig;
pub use document::{Document, ElementNode, Node, TextNode};
pub use fragment::{ReconcileStats, Reconciler};
pub use mark::Mark;
/// Re-export the `Replica` struct for easier access.
pub use replica::Replica;

/// Y-CRDT types re-exported for convenience.
///
/// This module re-exports the `yrs` crate so that client code doesn't need to
/// add `yrs` as a separate dependency to open transactions or fragments.
pub mod y_crdt {
    pub use yrs::*;
}

/// Result type used throughout the yprose library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the yprose library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured validation errors from the document module
    #[error(transparent)]
    Document(document::DocumentError),

    /// Structured conversion errors from the fragment module
    #[error(transparent)]
    Fragment(fragment::FragmentError),

    /// Structured synchronization errors from the replica module
    #[error(transparent)]
    Replica(replica::ReplicaError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Document(_) => "document",
            Error::Fragment(_) => "fragment",
            Error::Replica(_) => "replica",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error comes from invalid ProseMirror JSON input.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Document(_))
    }

    /// Check if this error is a missing or empty node `type`.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Document(document_err) => document_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error comes from tree content with no JSON counterpart.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::Fragment(fragment_err) => fragment_err.is_unsupported(),
            _ => false,
        }
    }

    /// Check if this error comes from mark data stored in the tree.
    pub fn is_mark_error(&self) -> bool {
        match self {
            Error::Fragment(fragment_err) => fragment_err.is_mark_error(),
            _ => false,
        }
    }

    /// Check if this error comes from undecodable bytes.
    pub fn is_decode_error(&self) -> bool {
        match self {
            Error::Replica(replica_err) => replica_err.is_decode_error(),
            _ => false,
        }
    }

    /// Check if this error is replica-related.
    pub fn is_replica_error(&self) -> bool {
        matches!(self, Error::Replica(_))
    }
}
