//! MCP client: JSON-RPC envelopes and response correlation over a transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ServerInfo, ToolInfo,
};
use crate::transport::{
    HttpConfig, HttpTransport, StdioConfig, StdioTransport, Transport, TransportType,
};

/// Configuration for an MCP server connection.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Name for this server, used in logs.
    pub name: String,
    /// Transport type.
    pub transport: TransportType,
    /// Command to spawn (for stdio transport).
    pub command: String,
    /// URL for the server (for HTTP transport).
    pub url: Option<String>,
    /// Arguments to pass to the command.
    pub args: Vec<String>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
    /// Bearer token (for HTTP transport).
    pub auth_token: Option<String>,
    /// HTTP headers (for HTTP transport).
    pub headers: Vec<(String, String)>,
    /// Request timeout. Bounds HTTP calls and, when set, stdio reads.
    pub timeout: Option<Duration>,
    /// How long a spawned server must stay alive to count as started.
    pub startup_grace: Option<Duration>,
    /// How long to wait for a spawned server to exit before killing it.
    pub shutdown_timeout: Option<Duration>,
    /// Routing hint sent with every `tools/call`.
    pub server_name: Option<String>,
}

impl McpServerConfig {
    /// Create a new server config for stdio transport.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportType::Stdio,
            command: command.into(),
            url: None,
            args: Vec::new(),
            env: Vec::new(),
            auth_token: None,
            headers: Vec::new(),
            timeout: None,
            startup_grace: None,
            shutdown_timeout: None,
            server_name: None,
        }
    }

    /// Create a new server config for HTTP transport.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            transport: TransportType::Http,
            url: Some(url.into()),
            ..Self::new(name, String::new())
        }
    }

    /// Add arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the bearer token (for HTTP transport).
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Add an HTTP header (for HTTP transport).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the startup grace period (for stdio transport).
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = Some(grace);
        self
    }

    /// Set the shutdown timeout (for stdio transport).
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Set the `tools/call` routing hint.
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// Check if this is an HTTP transport config.
    pub fn is_http(&self) -> bool {
        self.transport == TransportType::Http
    }

    /// Check if this is a stdio transport config.
    pub fn is_stdio(&self) -> bool {
        self.transport == TransportType::Stdio
    }

    /// Build the stdio transport settings from this config.
    pub fn stdio_config(&self) -> StdioConfig {
        let mut config = StdioConfig::new(&self.command).with_args(self.args.clone());
        config.env = self.env.clone();
        config.read_timeout = self.timeout;
        if let Some(grace) = self.startup_grace {
            config.startup_grace = grace;
        }
        if let Some(timeout) = self.shutdown_timeout {
            config.shutdown_timeout = timeout;
        }
        config
    }

    /// Build the HTTP transport settings from this config.
    pub fn http_config(&self) -> Result<HttpConfig> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| McpError::transport("HTTP transport requires a URL"))?;

        let mut config = HttpConfig::new(url);
        config.auth_token = self.auth_token.clone();
        config.headers = self.headers.clone();
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        Ok(config)
    }
}

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Transport open, handshake not yet performed.
    Connected,
    /// Ready for tool calls.
    Initialized,
    /// A response could not be correlated; the session cannot be trusted.
    Desynchronized,
}

/// An MCP client bound to a single server session.
///
/// Calls are strictly sequential: the transport sits behind a mutex and only
/// one request is ever in flight, so each response read is the reply to the
/// request just sent. Ids still increase monotonically and are checked.
pub struct McpClient {
    /// Server name, for logs.
    name: String,
    /// Routing hint for `tools/call`.
    server_name: Option<String>,
    /// Transport for communicating with the server.
    transport: Mutex<Box<dyn Transport>>,
    /// Which transport is in use.
    transport_type: TransportType,
    /// Server info (after a stdio handshake).
    server_info: Option<ServerInfo>,
    /// Counter for generating unique request IDs.
    request_id: AtomicU64,
    /// Session state.
    state: Mutex<SessionState>,
}

impl McpClient {
    /// Connect to an MCP server using the configured transport.
    ///
    /// This does NOT initialize the connection - call `initialize()` after connecting.
    pub fn connect(config: McpServerConfig) -> Result<Self> {
        match config.transport {
            TransportType::Stdio => Self::connect_stdio(config),
            TransportType::Http => Self::connect_http(config),
        }
    }

    /// Spawn the server process and attach to its pipes.
    pub fn connect_stdio(config: McpServerConfig) -> Result<Self> {
        let transport = StdioTransport::start(&config.stdio_config())?;

        tracing::info!(
            server = %config.name,
            command = %config.command,
            "connected to MCP server via stdio"
        );

        Ok(Self::with_transport(config.name, Box::new(transport))
            .with_server_name(config.server_name))
    }

    /// Create an HTTP client for the configured URL.
    pub fn connect_http(config: McpServerConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.http_config()?)?;

        tracing::info!(
            server = %config.name,
            url = %transport.url(),
            "connected to MCP server via HTTP"
        );

        Ok(Self::with_transport(config.name, Box::new(transport))
            .with_server_name(config.server_name))
    }

    /// Build a client over an already-open transport.
    pub fn with_transport(name: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        let transport_type = transport.kind();
        Self {
            name: name.into(),
            server_name: None,
            transport: Mutex::new(transport),
            transport_type,
            server_info: None,
            request_id: AtomicU64::new(1),
            state: Mutex::new(SessionState::Connected),
        }
    }

    fn with_server_name(mut self, server_name: Option<String>) -> Self {
        self.server_name = server_name;
        self
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the server info (after a stdio handshake).
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Which transport this client uses.
    pub fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    /// Check if the client has been initialized.
    pub fn is_initialized(&self) -> bool {
        *self.state.lock() == SessionState::Initialized
    }

    /// Get the next request ID.
    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and return the `result` of its response.
    ///
    /// Notifications the server sends ahead of the reply are skipped. The
    /// reply must carry the same id. A mismatch, or a stdio timeout
    /// that may leave a stale reply in the pipe, desynchronizes the session
    /// and every later call fails.
    pub fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if *self.state.lock() == SessionState::Desynchronized {
            return Err(McpError::protocol(
                "session desynchronized by an earlier failure; reconnect",
            ));
        }

        let request = JsonRpcRequest::new(self.next_request_id(), method, params);
        let line = serde_json::to_string(&request)?;

        let response = {
            let mut transport = self.transport.lock();
            let mut reply = transport.round_trip(&line);
            loop {
                let text = match reply {
                    Ok(text) => text,
                    Err(McpError::Timeout) if self.transport_type == TransportType::Stdio => {
                        self.desynchronize();
                        return Err(McpError::Timeout);
                    }
                    Err(e) => return Err(e),
                };

                match decode_message(&text)? {
                    Incoming::Response(response) => break response,
                    Incoming::Notification(notification) => {
                        tracing::debug!(
                            server = %self.name,
                            method = %notification,
                            "skipping server notification"
                        );
                        reply = transport.receive();
                    }
                }
            }
        };

        if response.id != Some(request.id) {
            tracing::error!(
                server = %self.name,
                expected = request.id,
                actual = ?response.id,
                "MCP response id mismatch"
            );
            self.desynchronize();
            return Err(McpError::IdMismatch {
                expected: request.id,
                actual: response.id,
            });
        }

        response.into_result().map_err(|e| {
            tracing::debug!(
                server = %self.name,
                method = %method,
                code = e.code,
                message = %e.message,
                "MCP server returned an error"
            );
            McpError::server_error(e.code, e.message, e.data)
        })
    }

    /// Send a notification (no response expected).
    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let line = serde_json::to_string(&notification)?;
        self.transport.lock().notify(&line)
    }

    fn desynchronize(&self) {
        *self.state.lock() = SessionState::Desynchronized;
    }

    /// Initialize the connection with the MCP server.
    ///
    /// On stdio this performs the `initialize` / `notifications/initialized`
    /// handshake. HTTP servers are stateless and already initialized, so the
    /// session is simply marked ready. Must be called before tool calls.
    pub fn initialize(&mut self) -> Result<Option<&ServerInfo>> {
        if self.is_initialized() {
            return Ok(self.server_info.as_ref());
        }

        let needs_handshake = self.transport.lock().requires_handshake();
        if needs_handshake {
            let params = InitializeParams::default();
            let result = self.call("initialize", Some(serde_json::to_value(&params)?))?;
            let init_result: InitializeResult = serde_json::from_value(result)?;

            tracing::info!(
                server = %self.name,
                remote = %init_result.server_info.name,
                version = %init_result.server_info.version,
                protocol = %init_result.protocol_version,
                "MCP server initialized"
            );

            self.notify("notifications/initialized", Some(serde_json::json!({})))?;
            self.server_info = Some(init_result.server_info);
        } else {
            tracing::debug!(server = %self.name, "stateless transport, skipping handshake");
        }

        *self.state.lock() = SessionState::Initialized;
        Ok(self.server_info.as_ref())
    }

    fn ensure_initialized(&self) -> Result<()> {
        match *self.state.lock() {
            SessionState::Initialized => Ok(()),
            SessionState::Connected => Err(McpError::NotInitialized),
            SessionState::Desynchronized => Err(McpError::protocol(
                "session desynchronized by an earlier failure; reconnect",
            )),
        }
    }

    /// List available tools from the server.
    pub fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        self.ensure_initialized()?;

        let result = self.call("tools/list", Some(serde_json::json!({})))?;
        let list_result: ListToolsResult = serde_json::from_value(result)?;

        tracing::debug!(
            server = %self.name,
            tool_count = list_result.tools.len(),
            "listed MCP tools"
        );

        Ok(list_result.tools)
    }

    /// Call a tool on the server and return the raw `result`.
    ///
    /// # Arguments
    /// * `name` - The name of the tool to call
    /// * `arguments` - The arguments to pass to the tool
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.ensure_initialized()?;

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
            server_name: self.server_name.clone(),
        };

        let result = self.call("tools/call", Some(serde_json::to_value(&params)?))?;

        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_error {
            tracing::warn!(server = %self.name, tool = %name, "tool call returned error");
        } else {
            tracing::debug!(server = %self.name, tool = %name, "tool call succeeded");
        }

        Ok(result)
    }

    /// Close the session and release the transport.
    pub fn close(&mut self) -> Result<()> {
        tracing::info!(server = %self.name, "closing MCP client");
        self.transport.lock().close()
    }

    /// Check if the connection is still active.
    pub fn is_connected(&self) -> bool {
        self.transport.lock().is_connected()
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        let _ = self.transport.get_mut().close();
    }
}

/// One message read from the server.
enum Incoming {
    Response(JsonRpcResponse),
    /// Server-initiated notification (log line, progress), by method name.
    Notification(String),
}

/// Parse one message, classifying unparseable text separately from
/// server-reported errors.
fn decode_message(reply: &str) -> Result<Incoming> {
    let malformed = |e: serde_json::Error| {
        tracing::error!(error = %e, line = %reply, "malformed MCP response");
        McpError::malformed(e, reply)
    };

    let value: Value = serde_json::from_str(reply).map_err(malformed)?;
    let has_id = value.get("id").is_some_and(|id| !id.is_null());
    if !has_id && let Some(method) = value.get("method").and_then(Value::as_str) {
        return Ok(Incoming::Notification(method.to_string()));
    }

    serde_json::from_value(value)
        .map(Incoming::Response)
        .map_err(malformed)
}
