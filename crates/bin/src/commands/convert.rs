//! Document conversion commands - build, serialize and reconcile state files.
//!
//! State files hold a single v1 update encoding the whole document, as
//! produced by `Y.encodeStateAsUpdate` in Yjs.

use std::fs;
use std::path::Path;

use yprose::{Document, Replica, ReplicaConfig};

use crate::cli::{BuildArgs, ReconcileArgs, SerializeArgs};
use crate::output::{OutputFormat, print_fields, print_json};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn read_document(path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(Document::from_json_str(&json)?)
}

fn load_replica(path: &Path, config: &ReplicaConfig) -> Result<Replica, Box<dyn std::error::Error>> {
    let state = fs::read(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(Replica::load(config.clone(), &state)?)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> CommandResult {
    fs::write(path, bytes).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Run the build command
pub fn build(args: &BuildArgs, config: &ReplicaConfig) -> CommandResult {
    let document = read_document(&args.document)?;
    let replica = Replica::new(config.clone());
    replica.build(&document)?;

    let state = replica.encode_state();
    write_bytes(&args.output, &state)?;
    tracing::info!(
        nodes = document.content.len(),
        bytes = state.len(),
        output = %args.output.display(),
        "Wrote document state"
    );
    Ok(())
}

/// Run the serialize command
pub fn serialize(args: &SerializeArgs, config: &ReplicaConfig) -> CommandResult {
    let replica = load_replica(&args.state, config)?;
    println!("{}", serde_json::to_string_pretty(&replica.to_document()?)?);
    Ok(())
}

/// Run the reconcile command
pub fn reconcile(args: &ReconcileArgs, config: &ReplicaConfig, format: OutputFormat) -> CommandResult {
    let replica = load_replica(&args.state, config)?;
    let document = read_document(&args.document)?;

    let before = replica.state_vector();
    let stats = replica.reconcile(&document)?;
    let delta = replica.diff(&before)?;
    write_bytes(&args.output, &delta)?;
    if let Some(path) = &args.write_state {
        write_bytes(path, &replica.encode_state())?;
    }

    match format {
        OutputFormat::Human => print_fields(&[
            ("Unchanged", stats.unchanged.to_string()),
            ("Updated", stats.updated.to_string()),
            ("Removed", stats.removed.to_string()),
            ("Inserted", stats.inserted.to_string()),
            ("Delta", format!("{} bytes", delta.len())),
        ]),
        OutputFormat::Json => print_json(&serde_json::json!({
            "unchanged": stats.unchanged,
            "updated": stats.updated,
            "removed": stats.removed,
            "inserted": stats.inserted,
            "delta_bytes": delta.len(),
        }))?,
    }
    Ok(())
}
