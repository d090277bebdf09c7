//! CLI argument definitions for the yprose binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use yprose::ReplicaConfig;
use yprose::constants::DEFAULT_FRAGMENT;
use yprose::y_crdt::OffsetKind;

/// Unit of text offsets in the document
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Offsets {
    /// UTF-8 bytes (the yrs default)
    Bytes,
    /// UTF-16 code units (what Yjs in a browser uses)
    Utf16,
}

impl From<Offsets> for OffsetKind {
    fn from(offsets: Offsets) -> Self {
        match offsets {
            Offsets::Bytes => OffsetKind::Bytes,
            Offsets::Utf16 => OffsetKind::Utf16,
        }
    }
}

/// Convert between ProseMirror JSON and Y-CRDT document state
#[derive(Parser, Debug)]
#[command(name = "yprose")]
#[command(about = "yprose: ProseMirror JSON <-> Y-CRDT XML fragments")]
#[command(version)]
pub struct Cli {
    /// Name of the XML fragment holding the document
    #[arg(long, global = true, default_value = DEFAULT_FRAGMENT, env = "YPROSE_FRAGMENT")]
    pub fragment: String,

    /// Unit of text offsets; must match every other replica of the document
    #[arg(long, global = true, default_value = "utf16", env = "YPROSE_OFFSET_KIND")]
    pub offset_kind: Offsets,

    /// Print machine-readable JSON instead of human-readable text
    #[arg(long, global = true, env = "YPROSE_JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Replica settings selected by the global flags.
    pub fn replica_config(&self) -> ReplicaConfig {
        ReplicaConfig::default()
            .with_fragment_name(self.fragment.clone())
            .with_offset_kind(self.offset_kind.into())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a fresh document state from ProseMirror JSON
    Build(BuildArgs),
    /// Print the ProseMirror JSON held by a document state
    Serialize(SerializeArgs),
    /// Update a document state toward new ProseMirror JSON and write the delta
    Reconcile(ReconcileArgs),
    /// Encode or decode text-attribute keys of marks
    #[command(subcommand)]
    Mark(MarkCommand),
}

/// Arguments for the build command
#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// ProseMirror JSON document to read
    pub document: PathBuf,

    /// Where to write the full v1 state update
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the serialize command
#[derive(clap::Args, Debug)]
pub struct SerializeArgs {
    /// Full v1 state update to read
    pub state: PathBuf,
}

/// Arguments for the reconcile command
#[derive(clap::Args, Debug)]
pub struct ReconcileArgs {
    /// Full v1 state update holding the current document
    pub state: PathBuf,

    /// ProseMirror JSON document describing the desired content
    pub document: PathBuf,

    /// Where to write the v1 update relative to the prior state
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write the full state after the update to this path
    #[arg(long)]
    pub write_state: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum MarkCommand {
    /// Print the attribute key a mark is stored under
    Encode(MarkEncodeArgs),
    /// Print the mark type an attribute key stands for
    Decode(MarkDecodeArgs),
}

/// Arguments for the mark encode command
#[derive(clap::Args, Debug)]
pub struct MarkEncodeArgs {
    /// Mark type, such as `bold` or `link`
    pub mark_type: String,

    /// Mark attributes as a JSON object
    #[arg(long)]
    pub attrs: Option<String>,
}

/// Arguments for the mark decode command
#[derive(clap::Args, Debug)]
pub struct MarkDecodeArgs {
    /// Text-attribute key to decode
    pub key: String,
}
