//! Error types for replica synchronization and snapshots.

use thiserror::Error;

/// Errors raised by the CRDT engine while exchanging or restoring state.
///
/// Engine errors are carried as their message; the engine's own error types
/// are not part of this crate's API.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// Bytes that are not a valid v1 encoding of the expected structure
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A decoded update the document refused to integrate
    #[error("Failed to apply update: {reason}")]
    Apply { reason: String },

    /// Snapshot state that cannot be restored
    #[error("Snapshot unavailable: {reason}")]
    Snapshot { reason: String },
}

impl ReplicaError {
    /// Check if this error comes from malformed input bytes
    pub fn is_decode_error(&self) -> bool {
        matches!(self, ReplicaError::Decode { .. })
    }

    /// Check if this error comes from snapshot handling
    pub fn is_snapshot_error(&self) -> bool {
        matches!(self, ReplicaError::Snapshot { .. })
    }
}

impl From<ReplicaError> for crate::Error {
    fn from(err: ReplicaError) -> Self {
        crate::Error::Replica(err)
    }
}
