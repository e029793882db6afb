//! Error types for MCP operations.

use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Coarse classification of an [`McpError`].
///
/// Lets callers tell "could not reach the server" (`Launch`, `Transport`)
/// apart from "server reached but the call failed" (`Protocol`) without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server process could not be started.
    Launch,
    /// Pipe, socket or HTTP failure after the session was established.
    Transport,
    /// Bytes arrived but violated the JSON-RPC contract.
    Protocol,
    /// The caller used the client incorrectly.
    Usage,
}

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process could not be launched or exited right after start.
    #[error("failed to launch MCP server: {0}")]
    Launch(String),

    /// Failed to communicate with the MCP server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The HTTP endpoint answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The server closed its end of the channel.
    #[error("connection closed")]
    ConnectionClosed,

    /// Timeout waiting for response.
    #[error("timeout waiting for response")]
    Timeout,

    /// IO error on the underlying pipe.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be parsed as JSON.
    ///
    /// Usually means something other than JSON-RPC was written to the
    /// channel (for instance stray log output on stdout).
    #[error("malformed response ({reason}): {line}")]
    MalformedResponse {
        /// Parser error.
        reason: String,
        /// The offending text, truncated.
        line: String,
    },

    /// The response id did not match the request id.
    #[error("response id mismatch: expected {expected}, got {actual:?}")]
    IdMismatch {
        /// Id of the request in flight.
        expected: u64,
        /// Id carried by the response.
        actual: Option<u64>,
    },

    /// Server returned an error response.
    #[error("server error {code}: {message}")]
    ServerError {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server not initialized.
    #[error("server not initialized - call initialize() first")]
    NotInitialized,

    /// The requested tool is not part of the WhatsApp tool surface.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments were missing or had the wrong type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Longest slice of an offending line kept in [`McpError::MalformedResponse`].
const MAX_LINE_PREVIEW: usize = 200;

impl McpError {
    /// Create a launch error.
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a malformed-response error, truncating the offending line.
    pub fn malformed(reason: impl ToString, line: &str) -> Self {
        let line = match line.char_indices().nth(MAX_LINE_PREVIEW) {
            Some((idx, _)) => format!("{}...", &line[..idx]),
            None => line.to_string(),
        };
        Self::MalformedResponse {
            reason: reason.to_string(),
            line,
        }
    }

    /// Create a server error from an error response.
    pub fn server_error(
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create an invalid-arguments error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch(_) => ErrorKind::Launch,
            Self::Transport(_)
            | Self::HttpStatus { .. }
            | Self::ConnectionClosed
            | Self::Timeout
            | Self::Io(_) => ErrorKind::Transport,
            Self::MalformedResponse { .. }
            | Self::IdMismatch { .. }
            | Self::ServerError { .. }
            | Self::Protocol(_)
            | Self::Json(_) => ErrorKind::Protocol,
            Self::NotInitialized | Self::UnknownTool(_) | Self::InvalidArguments(_) => {
                ErrorKind::Usage
            }
        }
    }

    /// True when the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Launch | ErrorKind::Transport)
    }

    /// True when the server was reached but the exchange failed.
    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }
}
