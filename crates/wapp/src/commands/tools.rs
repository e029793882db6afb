//! `wapp tools` and `wapp catalogue`.

use anyhow::Result;
use console::style;
use wapp_mcp::{ToolInfo, tool_catalogue};

use super::Context;
use super::session::with_whatsapp;

/// List the tools the server reports over `tools/list`.
pub fn run_tools(ctx: &Context) -> Result<()> {
    let tools = with_whatsapp(ctx, |whatsapp| whatsapp.get_available_tools())?;
    print_tools(ctx, &tools)
}

/// Print the built-in descriptors handed to language models.
pub fn run_catalogue(ctx: &Context) -> Result<()> {
    print_tools(ctx, &tool_catalogue())
}

fn print_tools(ctx: &Context, tools: &[ToolInfo]) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(tools)?);
        return Ok(());
    }

    println!("{}", style(format!("Tools ({})", tools.len())).bold());
    for tool in tools {
        println!(
            "  {:<24} {}",
            style(&tool.name).cyan(),
            tool.description.as_deref().unwrap_or("")
        );
        if ctx.verbose
            && let Some(schema) = &tool.input_schema
        {
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
    }
    Ok(())
}
