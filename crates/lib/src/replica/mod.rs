//! A document replica: one `yrs` document holding one ProseMirror tree.
//!
//! [`Replica`] bundles a [`yrs::Doc`], its named XML fragment and the
//! [`ReplicaConfig`] it was created with. Each conversion opens its own
//! transaction, so every call produces exactly one update for observers.
//!
//! Replicas exchange state with the v1 update encoding:
//!
//! ```
//! use yprose::{Document, Replica, ReplicaConfig};
//!
//! let json = serde_json::json!({
//!     "type": "doc",
//!     "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Hi"}]}]
//! });
//!
//! let local = Replica::new(ReplicaConfig::default());
//! local.build_json(&json)?;
//!
//! let remote = Replica::new(ReplicaConfig::default());
//! remote.sync(&local.diff(&remote.state_vector())?)?;
//! assert_eq!(remote.to_json()?, json);
//! # Ok::<(), yprose::Error>(())
//! ```

mod errors;
pub use errors::ReplicaError;

use serde_json::Value;
use tracing::debug;
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::{Encode, Encoder, EncoderV1};
use yrs::{Doc, ReadTxn, Snapshot, StateVector, Transact, Update, XmlFragmentRef};

use crate::config::ReplicaConfig;
use crate::document::Document;
use crate::fragment::{self, ReconcileStats, Reconciler};
use crate::Result;

/// A `yrs` document whose named XML fragment holds a ProseMirror tree.
pub struct Replica {
    doc: Doc,
    fragment: XmlFragmentRef,
    config: ReplicaConfig,
}

impl Replica {
    /// Create a replica over a fresh, empty document.
    pub fn new(config: ReplicaConfig) -> Self {
        let doc = config.new_doc();
        Self::with_doc(doc, config)
    }

    /// Wrap an existing document.
    ///
    /// The offset kind and garbage collection setting are taken from `doc`,
    /// overriding the ones in `config`.
    pub fn with_doc(doc: Doc, config: ReplicaConfig) -> Self {
        let config = config
            .with_offset_kind(doc.offset_kind())
            .with_skip_gc(doc.skip_gc());
        let fragment = doc.get_or_insert_xml_fragment(config.fragment_name.as_str());
        Self {
            doc,
            fragment,
            config,
        }
    }

    /// Create a replica and integrate a full v1 state update into it.
    pub fn load(config: ReplicaConfig, update: &[u8]) -> Result<Self> {
        let replica = Self::new(config);
        replica.sync(update)?;
        Ok(replica)
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn fragment(&self) -> &XmlFragmentRef {
        &self.fragment
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    // ===== CONVERSION =====

    /// Serialize the fragment to a document.
    pub fn to_document(&self) -> Result<Document> {
        let txn = self.doc.transact();
        fragment::serialize(&txn, &self.fragment)
    }

    /// Serialize the fragment to ProseMirror JSON.
    pub fn to_json(&self) -> Result<Value> {
        Ok(self.to_document()?.to_value()?)
    }

    /// Append `document` to the fragment in one transaction.
    pub fn build(&self, document: &Document) -> Result<()> {
        let mut txn = self.doc.transact_mut();
        fragment::build(&mut txn, &self.fragment, document)
    }

    /// Parse `json` and [`build`](Self::build) it.
    pub fn build_json(&self, json: &Value) -> Result<()> {
        self.build(&Document::from_value(json.clone())?)
    }

    /// Update the fragment in place until it serializes to `document`.
    pub fn reconcile(&self, document: &Document) -> Result<ReconcileStats> {
        let mut txn = self.doc.transact_mut();
        self.reconciler().reconcile(&mut txn, &self.fragment, document)
    }

    /// Parse `json` and [`reconcile`](Self::reconcile) toward it.
    pub fn reconcile_json(&self, json: &Value) -> Result<ReconcileStats> {
        self.reconcile(&Document::from_value(json.clone())?)
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.config.offset_kind)
    }

    // ===== SYNCHRONIZATION =====

    /// The v1-encoded state vector of this replica.
    pub fn state_vector(&self) -> Vec<u8> {
        self.doc.transact().state_vector().encode_v1()
    }

    /// The whole document state as one v1 update.
    pub fn encode_state(&self) -> Vec<u8> {
        self.doc
            .transact()
            .encode_state_as_update_v1(&StateVector::default())
    }

    /// Everything this replica has that a peer at `state_vector` is missing.
    pub fn diff(&self, state_vector: &[u8]) -> Result<Vec<u8>> {
        let remote = StateVector::decode_v1(state_vector).map_err(|e| ReplicaError::Decode {
            what: "state vector",
            reason: e.to_string(),
        })?;
        let update = self.doc.transact().encode_state_as_update_v1(&remote);
        debug!(bytes = update.len(), "Encoded state diff");
        Ok(update)
    }

    /// Integrate a v1 update from another replica.
    pub fn sync(&self, update: &[u8]) -> Result<()> {
        let decoded = Update::decode_v1(update).map_err(|e| ReplicaError::Decode {
            what: "update",
            reason: e.to_string(),
        })?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(decoded)
            .map_err(|e| ReplicaError::Apply {
                reason: e.to_string(),
            })?;
        debug!(bytes = update.len(), "Applied update");
        Ok(())
    }

    // ===== SNAPSHOTS =====

    /// Capture the current state for later inspection.
    ///
    /// Snapshots can only be restored when the replica keeps deleted content
    /// (`skip_gc`).
    pub fn snapshot(&self) -> Snapshot {
        self.doc.transact().snapshot()
    }

    pub fn encode_snapshot(snapshot: &Snapshot) -> Vec<u8> {
        snapshot.encode_v1()
    }

    pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
        Snapshot::decode_v1(bytes).map_err(|e| {
            ReplicaError::Decode {
                what: "snapshot",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// The document as it was when `snapshot` was taken.
    pub fn document_at(&self, snapshot: &Snapshot) -> Result<Document> {
        if !self.config.skip_gc {
            return Err(ReplicaError::Snapshot {
                reason: "replica was created without skip_gc".to_string(),
            }
            .into());
        }

        let update = {
            let txn = self.doc.transact();
            let mut encoder = EncoderV1::new();
            txn.encode_state_from_snapshot(snapshot, &mut encoder)
                .map_err(|_| ReplicaError::Snapshot {
                    reason: "deleted content was garbage collected".to_string(),
                })?;
            encoder.to_vec()
        };

        let past = Replica::new(self.config.clone().with_skip_gc(false));
        past.sync(&update)?;
        past.to_document()
    }
}

impl std::fmt::Debug for Replica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replica")
            .field("client_id", &self.doc.client_id())
            .field("config", &self.config)
            .finish()
    }
}
