//! `wapp info`: who is on the other end.

use anyhow::Result;
use console::style;
use serde_json::{Value, json};
use wapp_mcp::{HttpConfig, HttpTransport, TransportType};

use super::Context;
use super::session::{explain, server_config, with_whatsapp};

/// Stdio servers describe themselves in the handshake; HTTP gateways answer
/// a GET on their base URL.
pub fn run(ctx: &Context) -> Result<()> {
    let config = server_config(ctx.config())?;

    let info = match config.transport {
        TransportType::Http => {
            let http: HttpConfig = config.http_config()?;
            let url = http.url.clone();
            let transport = HttpTransport::new(http).map_err(|e| explain(e, &config.name))?;
            let status = transport.server_info().map_err(|e| explain(e, &config.name))?;
            json!({"transport": "http", "url": url, "server": status})
        }
        TransportType::Stdio => {
            let command = config.command.clone();
            let server = with_whatsapp(ctx, |whatsapp| Ok(whatsapp.server_info().cloned()))?;
            json!({"transport": "stdio", "command": command, "server": server})
        }
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", style("MCP Server").bold());
    println!("  Transport: {}", config.transport);
    if let Some(url) = info.get("url").and_then(Value::as_str) {
        println!("  URL:       {}", url);
    }
    if let Some(command) = info.get("command").and_then(Value::as_str) {
        println!("  Command:   {}", command);
    }
    match &info["server"] {
        Value::Null => println!("  Server:    (no details reported)"),
        Value::Object(map) if map.contains_key("name") && map.contains_key("version") => {
            println!(
                "  Server:    {} v{}",
                map["name"].as_str().unwrap_or_default(),
                map["version"].as_str().unwrap_or_default()
            );
        }
        other => println!("  Server:    {}", other),
    }
    Ok(())
}
