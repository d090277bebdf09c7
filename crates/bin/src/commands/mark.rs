//! Mark codec commands - encode and decode text-attribute keys.

use yprose::mark::{Attrs, decode_mark_name, encode_mark_name, is_encoded_mark_name};

use crate::cli::{MarkDecodeArgs, MarkEncodeArgs};
use crate::output::{OutputFormat, print_fields, print_json};

/// Run the mark encode command
pub fn encode(args: &MarkEncodeArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let attrs: Option<Attrs> = match &args.attrs {
        Some(json) => Some(
            serde_json::from_str(json)
                .map_err(|e| format!("--attrs must be a JSON object: {e}"))?,
        ),
        None => None,
    };
    let key = encode_mark_name(&args.mark_type, attrs.as_ref());

    match format {
        OutputFormat::Human => println!("{key}"),
        OutputFormat::Json => print_json(&serde_json::json!({
            "type": args.mark_type,
            "attrs": attrs,
            "key": key,
        }))?,
    }
    Ok(())
}

/// Run the mark decode command
pub fn decode(args: &MarkDecodeArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mark_type = decode_mark_name(&args.key);
    let hashed = is_encoded_mark_name(&args.key);

    match format {
        OutputFormat::Human => print_fields(&[
            ("Type", mark_type.to_string()),
            ("Attributes", (if hashed { "hashed" } else { "none" }).to_string()),
        ]),
        OutputFormat::Json => print_json(&serde_json::json!({
            "key": args.key,
            "type": mark_type,
            "hashed": hashed,
        }))?,
    }
    Ok(())
}
