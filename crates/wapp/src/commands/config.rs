//! `wapp config`: show where settings came from and what they resolve to.

use anyhow::Result;
use console::style;
use serde_json::json;
use wapp_config::Endpoint;

use super::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let server = loaded.config.server.clone().unwrap_or_default();
    let resolved = server.resolve();
    let token_set = server.effective_token().is_some();

    if ctx.json_output {
        let endpoint = match &resolved {
            Ok(r) => match &r.endpoint {
                Endpoint::Stdio { command, args, .. } => {
                    json!({"transport": "stdio", "command": command, "args": args})
                }
                Endpoint::Http { url, .. } => {
                    json!({"transport": "http", "url": url, "token": token_set})
                }
            },
            Err(e) => json!({"error": e.to_string()}),
        };
        let output = json!({
            "sources": loaded.loaded_from(),
            "env_overrides": loaded.env_overrides,
            "warnings": loaded.warnings,
            "server": endpoint,
            "log_dir": loaded.config.log_dir(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", style("Config sources").bold());
    for source in &loaded.sources {
        let mark = if source.loaded {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {} {}", mark, source.path.display());
    }
    for var in &loaded.env_overrides {
        println!("  {} ${}", style("✓").green(), var);
    }

    println!();
    println!("{}", style("Server").bold());
    match &resolved {
        Ok(r) => {
            println!("  Name:      {}", r.name);
            match &r.endpoint {
                Endpoint::Stdio { command, args, .. } => {
                    println!("  Transport: stdio");
                    println!("  Command:   {} {}", command, args.join(" "));
                }
                Endpoint::Http { url, .. } => {
                    println!("  Transport: http");
                    println!("  URL:       {}", url);
                    println!("  Token:     {}", if token_set { "set" } else { "none" });
                }
            }
            if let Some(timeout) = r.timeout {
                println!("  Timeout:   {}s", timeout.as_secs());
            }
        }
        Err(e) => println!("  {} {}", style("✗").red(), e),
    }

    if !loaded.warnings.is_empty() {
        println!();
        println!("{}", style("Warnings").yellow().bold());
        for warning in &loaded.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}
