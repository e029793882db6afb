//! Rendering tool payloads for humans and scripts.

use anyhow::{Result, bail};
use console::style;
use serde_json::Value;
use wapp_mcp::{ToolPayload, ToolStatus};

use super::Context;

/// Print a payload; a `success: false` status becomes an error.
pub fn print_payload(ctx: &Context, payload: &ToolPayload, record: fn(&Value) -> String) -> Result<()> {
    if let Some(status) = payload.as_status() {
        return print_status(ctx, &status);
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&payload.clone().into_value())?);
        return Ok(());
    }

    match payload.records() {
        Some([]) => println!("{}", style("No results.").dim()),
        Some(records) => {
            for item in records {
                println!("{}", record(item));
            }
        }
        None => println!("{}", payload),
    }
    Ok(())
}

/// Print the outcome of a state-changing tool.
pub fn print_status(ctx: &Context, status: &ToolStatus) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else if status.success {
        println!("{} {}", style("✓").green(), status.message);
        if let Some(path) = &status.file_path {
            println!("  Saved to: {}", path);
        }
    }

    if status.is_failure() {
        bail!("WhatsApp reported a failure: {}", status.message);
    }
    Ok(())
}

/// A string field, or an empty string.
pub fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Any record, one compact JSON line.
pub fn compact(value: &Value) -> String {
    value.to_string()
}

/// Shorten `text` to `max` characters with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
