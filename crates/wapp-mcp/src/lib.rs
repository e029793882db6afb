//! MCP (Model Context Protocol) client for a WhatsApp automation backend.
//!
//! This crate connects to a WhatsApp MCP server, either by spawning it as a
//! child process (stdio) or by posting to a remote gateway (HTTP), and exposes
//! the server's tools as typed operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  WhatsAppClient                                             │
//! │  - search_contacts, list_messages, send_message, ...        │
//! │  - dispatch(tool, args) for model-chosen calls              │
//! │  - Decodes content envelopes into ToolPayload               │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - JSON-RPC 2.0 envelopes, monotonically increasing ids     │
//! │  - initialize handshake, tools/list, tools/call             │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport                                                  │
//! │  - StdioTransport: newline-delimited JSON over pipes        │
//! │  - HttpTransport: one POST per message                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use wapp_mcp::{McpServerConfig, WhatsAppClient};
//!
//! let config = McpServerConfig::new("whatsapp", "uv")
//!     .with_args(vec!["--directory".into(), "/srv/whatsapp-mcp-server".into(), "run".into(), "main.py".into()])
//!     .with_env_var("PYTHONIOENCODING", "utf-8");
//!
//! let status = WhatsAppClient::scoped(config, |whatsapp| {
//!     whatsapp.send_message("51959812636", "Hola")
//! })?;
//! println!("{}", status);
//! ```
//!
//! # Protocol flow
//!
//! Over stdio:
//! 1. Client sends `initialize` with its capabilities
//! 2. Server responds with its info
//! 3. Client sends `notifications/initialized`
//! 4. Client calls `tools/list` and `tools/call`
//!
//! HTTP gateways are stateless; steps 1-3 are skipped.

pub mod client;
pub mod error;
pub mod payload;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod whatsapp;

#[cfg(test)]
mod testing;

pub use client::{McpClient, McpServerConfig};
pub use error::{ErrorKind, McpError, Result};
pub use payload::{ToolPayload, ToolStatus};
pub use protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerInfo, ToolInfo,
};
pub use tools::{TOOL_NAMES, find_tool, tool_catalogue};
pub use transport::{
    HttpConfig, HttpTransport, StdioConfig, StdioTransport, Transport, TransportType,
};
pub use whatsapp::{ListChatsQuery, ListMessagesQuery, WhatsAppClient};
