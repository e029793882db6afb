//! Turning configuration into a live WhatsApp session.

use anyhow::{Context as _, Result};
use wapp_config::{Endpoint, WappConfig};
use wapp_mcp::{ErrorKind, McpError, McpServerConfig, WhatsAppClient};

use super::Context;

/// Build the MCP connection settings from the `[server]` section.
pub fn server_config(config: &WappConfig) -> Result<McpServerConfig> {
    let section = config.server.clone().unwrap_or_default();
    let resolved = section
        .resolve()
        .context("no usable MCP server configured; set [server] in wapp.toml, WAPP_MCP_COMMAND, or WAPP_MCP_URL")?;

    let mut mcp = match resolved.endpoint {
        Endpoint::Stdio { command, args, env } => {
            let mut mcp = McpServerConfig::new(&resolved.name, command).with_args(args);
            for (key, value) in env {
                mcp = mcp.with_env_var(key, value);
            }
            mcp
        }
        Endpoint::Http { url, auth_token } => {
            let mut mcp = McpServerConfig::http(&resolved.name, url);
            if let Some(token) = auth_token {
                mcp = mcp.with_auth_token(token);
            }
            mcp
        }
    };

    if let Some(timeout) = resolved.timeout {
        mcp = mcp.with_timeout(timeout);
    }
    if let Some(grace) = resolved.startup_grace {
        mcp = mcp.with_startup_grace(grace);
    }
    if let Some(timeout) = resolved.shutdown_timeout {
        mcp = mcp.with_shutdown_timeout(timeout);
    }
    if let Some(server_name) = resolved.server_name {
        mcp = mcp.with_server_name(server_name);
    }

    Ok(mcp)
}

/// Run `f` inside one scoped session; the server is released on every path.
pub fn with_whatsapp<T, F>(ctx: &Context, f: F) -> Result<T>
where
    F: FnOnce(&WhatsAppClient) -> wapp_mcp::Result<T>,
{
    let config = server_config(ctx.config())?;
    let name = config.name.clone();

    tracing::debug!(server = %name, transport = %config.transport, "opening WhatsApp session");

    WhatsAppClient::scoped(config, f).map_err(|e| explain(e, &name))
}

/// Attach a hint that separates "could not reach" from "call failed".
pub fn explain(err: McpError, server: &str) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::Launch => format!("could not start MCP server '{}'", server),
        ErrorKind::Transport => format!("could not reach MCP server '{}'", server),
        ErrorKind::Protocol => format!("MCP server '{}' failed the request", server),
        ErrorKind::Usage => "invalid tool request".to_string(),
    };
    anyhow::Error::new(err).context(hint)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wapp_config::{ServerSection, TransportKind};
    use wapp_mcp::TransportType;

    use super::*;

    fn config(server: ServerSection) -> WappConfig {
        WappConfig {
            server: Some(server),
            ..Default::default()
        }
    }

    #[test]
    fn test_stdio_server_config() {
        let mcp = server_config(&config(ServerSection {
            command: Some("uv".to_string()),
            args: Some(vec!["run".to_string(), "main.py".to_string()]),
            startup_grace_ms: Some(250),
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(mcp.transport, TransportType::Stdio);
        assert_eq!(mcp.command, "uv");
        assert_eq!(mcp.args, vec!["run", "main.py"]);
        assert!(mcp.env.iter().any(|(k, v)| k == "PYTHONUTF8" && v == "1"));
        assert_eq!(mcp.startup_grace, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_http_server_config() {
        let mcp = server_config(&config(ServerSection {
            transport: Some(TransportKind::Http),
            url: Some("https://abc.ngrok-free.app/".to_string()),
            auth_token: Some("tok".to_string()),
            server_name: Some("whatsapp-mcp-remote".to_string()),
            timeout_secs: Some(15),
            ..Default::default()
        }))
        .unwrap();

        assert!(mcp.is_http());
        assert_eq!(mcp.url.as_deref(), Some("https://abc.ngrok-free.app/"));
        assert_eq!(mcp.auth_token.as_deref(), Some("tok"));
        assert_eq!(mcp.server_name.as_deref(), Some("whatsapp-mcp-remote"));
        assert_eq!(mcp.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_missing_server_is_an_error() {
        let err = server_config(&WappConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no usable MCP server"));
    }

    #[test]
    fn test_explain_launch_error() {
        let err = explain(McpError::launch("exited during startup"), "whatsapp");
        assert_eq!(err.to_string(), "could not start MCP server 'whatsapp'");
        assert!(format!("{:#}", err).contains("exited during startup"));
    }
}
