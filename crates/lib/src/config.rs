//! Replica configuration.

use yrs::{Doc, OffsetKind, Options};

use crate::constants::DEFAULT_FRAGMENT;

/// Settings for a [`Replica`](crate::Replica) and the document it owns.
///
/// # Example
///
/// ```
/// use yprose::ReplicaConfig;
/// use yprose::y_crdt::OffsetKind;
///
/// let config = ReplicaConfig::default()
///     .with_fragment_name("body")
///     .with_offset_kind(OffsetKind::Bytes)
///     .with_skip_gc(true);
/// assert_eq!(config.fragment_name, "body");
/// ```
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Name of the root XML fragment holding the document.
    pub fragment_name: String,

    /// Unit of text offsets. Every replica of a document must agree on it.
    pub offset_kind: OffsetKind,

    /// Keep deleted content around. Required for snapshots.
    pub skip_gc: bool,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            fragment_name: DEFAULT_FRAGMENT.to_string(),
            offset_kind: OffsetKind::Utf16,
            skip_gc: false,
        }
    }
}

impl ReplicaConfig {
    pub fn with_fragment_name(mut self, name: impl Into<String>) -> Self {
        self.fragment_name = name.into();
        self
    }

    pub fn with_offset_kind(mut self, offset_kind: OffsetKind) -> Self {
        self.offset_kind = offset_kind;
        self
    }

    pub fn with_skip_gc(mut self, skip_gc: bool) -> Self {
        self.skip_gc = skip_gc;
        self
    }

    /// Create an empty document with options matching this configuration.
    pub fn new_doc(&self) -> Doc {
        Doc::with_options(self.options())
    }

    pub(crate) fn options(&self) -> Options {
        let mut options = Options::default();
        options.offset_kind = self.offset_kind;
        options.skip_gc = self.skip_gc;
        options
    }
}
