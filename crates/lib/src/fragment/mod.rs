//! Conversion between a Y-CRDT XML fragment and ProseMirror documents.
//!
//! The fragment is the shared, replicated side of the mapping:
//!
//! - element children become element nodes, with their attributes as strings
//!   and the reserved `marks` attribute decoded back into node marks
//! - text children become text nodes, one per attributed chunk, with the
//!   chunk's text attributes decoded through [`crate::mark`]
//!
//! Three entry points operate on it:
//!
//! - [`serialize`] reads a fragment into a [`Document`](crate::Document)
//! - [`build`] appends a document to a fragment
//! - [`Reconciler`] updates a populated fragment in place with a small edit
//!   script, so concurrent edits from other replicas survive the merge
//!
//! All writers take the caller's [`yrs::TransactionMut`]. Every write of one
//! call is therefore part of that single transaction and of its update.

mod attrs;
mod build;
mod errors;
mod reconcile;
mod serialize;

use serde_json::Value;
use yrs::{OffsetKind, TransactionMut, XmlFragment};

pub use build::{build, json_to_fragment};
pub use errors::FragmentError;
pub use reconcile::{ReconcileStats, Reconciler};
pub use serialize::{fragment_to_json, serialize};

/// Reconcile `root` toward the JSON document `json`.
///
/// `offset_kind` must be the offset kind the document was created with.
pub fn update_fragment<F: XmlFragment>(
    txn: &mut TransactionMut,
    root: &F,
    json: &Value,
    offset_kind: OffsetKind,
) -> crate::Result<ReconcileStats> {
    Reconciler::new(offset_kind).reconcile_json(txn, root, json)
}
