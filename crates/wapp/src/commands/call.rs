//! `wapp call <tool> [json]`: route a tool by name, as an orchestrator would.

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;

use super::Context;
use super::output::{compact, print_payload};
use super::session::with_whatsapp;

/// Arguments for `wapp call`.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name (see `wapp catalogue`)
    pub tool: String,

    /// Arguments as a JSON object
    #[arg(default_value = "{}")]
    pub arguments: String,
}

pub fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let arguments = parse_arguments(&args.arguments)?;
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.dispatch(&args.tool, arguments))?;
    print_payload(ctx, &payload, compact)
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("arguments must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("arguments must be a JSON object, got {}", value);
    }
    Ok(value)
}
