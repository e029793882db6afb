//! Transport layer for MCP communication.
//!
//! Local servers are spawned as child processes and spoken to over their
//! standard streams, one JSON document per line. Remote servers receive each
//! document as the body of an HTTP POST.
//!
//! Transports move text only. Id assignment, parsing and correlation live in
//! [`crate::client::McpClient`].

mod http;
mod stdio;

pub use http::{HttpConfig, HttpTransport};
pub use stdio::{StdioConfig, StdioTransport};

use crate::error::Result;

/// Transport type for MCP server connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportType {
    /// Stdio transport - spawns a child process.
    #[default]
    Stdio,
    /// HTTP transport - connects to a remote server via HTTP POST.
    Http,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// A duplex text channel to one MCP server.
///
/// Implementations carry one serialized JSON-RPC message per call and never
/// interpret its contents.
pub trait Transport: Send {
    /// Which kind of transport this is.
    fn kind(&self) -> TransportType;

    /// Send one request and block until the matching reply text arrives.
    fn round_trip(&mut self, message: &str) -> Result<String>;

    /// Read the next message without sending anything.
    ///
    /// Used to skip server notifications that arrive ahead of a reply.
    fn receive(&mut self) -> Result<String>;

    /// Send one notification; no reply is read.
    fn notify(&mut self, message: &str) -> Result<()>;

    /// Whether the server expects the `initialize` handshake on this channel.
    ///
    /// HTTP endpoints treat every POST as self-contained and are assumed to be
    /// initialized already.
    fn requires_handshake(&self) -> bool {
        self.kind() == TransportType::Stdio
    }

    /// Check if the transport is still usable.
    fn is_connected(&mut self) -> bool;

    /// Release the underlying resources. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}
