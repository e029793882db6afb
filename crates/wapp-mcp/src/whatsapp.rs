//! Typed façade over the WhatsApp MCP server's tools.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::client::{McpClient, McpServerConfig};
use crate::error::{McpError, Result};
use crate::payload::ToolPayload;
use crate::protocol::{ServerInfo, ToolInfo};
use crate::tools::{
    CHECK_NEW_MESSAGES, DEFAULT_LIMIT, DEFAULT_SORT_BY, DOWNLOAD_MEDIA, LIST_CHATS, LIST_MESSAGES,
    MARK_MESSAGES_AS_SEEN, SEARCH_CONTACTS, SEND_FILE, SEND_MESSAGE,
};

/// Name accepted by [`WhatsAppClient::dispatch`] for listing tools.
pub const GET_AVAILABLE_TOOLS: &str = "get_available_tools";

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_sort_by() -> String {
    DEFAULT_SORT_BY.to_string()
}

/// Filters for `list_messages`. Unset filters are omitted from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMessagesQuery {
    /// ISO-8601 lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// ISO-8601 upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Only messages from this phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_phone_number: Option<String>,
    /// Only messages in this chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_jid: Option<String>,
    /// Content search term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Zero-based page number.
    #[serde(default)]
    pub page: u32,
}

impl Default for ListMessagesQuery {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            sender_phone_number: None,
            chat_jid: None,
            query: None,
            limit: DEFAULT_LIMIT,
            page: 0,
        }
    }
}

impl ListMessagesQuery {
    /// Restrict to one chat.
    pub fn in_chat(mut self, chat_jid: impl Into<String>) -> Self {
        self.chat_jid = Some(chat_jid.into());
        self
    }

    /// Restrict to one sender.
    pub fn from_sender(mut self, phone_number: impl Into<String>) -> Self {
        self.sender_phone_number = Some(phone_number.into());
        self
    }

    /// Search message content.
    pub fn matching(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Only messages after this ISO-8601 timestamp.
    pub fn after(mut self, timestamp: impl Into<String>) -> Self {
        self.after = Some(timestamp.into());
        self
    }

    /// Only messages before this ISO-8601 timestamp.
    pub fn before(mut self, timestamp: impl Into<String>) -> Self {
        self.before = Some(timestamp.into());
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the zero-based page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// Filters for `list_chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChatsQuery {
    /// Search term matched against chat name or JID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Zero-based page number.
    #[serde(default)]
    pub page: u32,
    /// Attach each chat's most recent message.
    #[serde(default = "default_true")]
    pub include_last_message: bool,
    /// Field to sort by.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

impl Default for ListChatsQuery {
    fn default() -> Self {
        Self {
            query: None,
            limit: DEFAULT_LIMIT,
            page: 0,
            include_last_message: true,
            sort_by: default_sort_by(),
        }
    }
}

impl ListChatsQuery {
    /// Search chat names and JIDs.
    pub fn matching(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the zero-based page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sort by another field.
    pub fn sorted_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = field.into();
        self
    }

    /// Leave out each chat's last message.
    pub fn without_last_message(mut self) -> Self {
        self.include_last_message = false;
        self
    }
}

/// WhatsApp operations on top of an initialized [`McpClient`].
///
/// Every method is one `tools/call` and returns the decoded payload. A
/// `{"success": false, ...}` status from the backend is a normal return
/// value; inspect it with [`ToolPayload::as_status`].
pub struct WhatsAppClient {
    client: McpClient,
}

impl WhatsAppClient {
    /// Wrap a client. It must already be initialized for tool calls to work.
    pub fn new(client: McpClient) -> Self {
        Self { client }
    }

    /// Connect and initialize in one step.
    pub fn connect(config: McpServerConfig) -> Result<Self> {
        let mut client = McpClient::connect(config)?;
        client.initialize()?;
        Ok(Self { client })
    }

    /// Open a session, run `f`, and close the session whatever `f` returns.
    ///
    /// An error from `f` wins over an error from closing.
    pub fn scoped<T, F>(config: McpServerConfig, f: F) -> Result<T>
    where
        F: FnOnce(&WhatsAppClient) -> Result<T>,
    {
        let mut whatsapp = Self::connect(config)?;
        let outcome = f(&whatsapp);
        let closed = whatsapp.close();
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
        }
    }

    /// The underlying protocol client.
    pub fn inner(&self) -> &McpClient {
        &self.client
    }

    /// Server info from the stdio handshake, if one happened.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.client.server_info()
    }

    /// Release the transport. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        self.client.close()
    }

    fn invoke(&self, tool: &str, arguments: Value) -> Result<ToolPayload> {
        let payload = ToolPayload::decode(self.client.call_tool(tool, arguments)?);
        if let Some(status) = payload.as_status().filter(|s| s.is_failure()) {
            tracing::warn!(tool = %tool, message = %status.message, "WhatsApp operation failed");
        }
        Ok(payload)
    }

    fn invoke_with<A: Serialize>(&self, tool: &str, arguments: &A) -> Result<ToolPayload> {
        self.invoke(tool, serde_json::to_value(arguments)?)
    }

    /// Find contacts whose name or phone number matches `query`.
    pub fn search_contacts(&self, query: &str) -> Result<ToolPayload> {
        self.invoke(SEARCH_CONTACTS, json!({ "query": query }))
    }

    /// Messages matching the filters in `query`.
    pub fn list_messages(&self, query: &ListMessagesQuery) -> Result<ToolPayload> {
        self.invoke_with(LIST_MESSAGES, query)
    }

    /// Chats matching `query`.
    pub fn list_chats(&self, query: &ListChatsQuery) -> Result<ToolPayload> {
        self.invoke_with(LIST_CHATS, query)
    }

    /// Send a text message. `recipient` is a phone number with country code
    /// or a JID.
    pub fn send_message(&self, recipient: &str, message: &str) -> Result<ToolPayload> {
        tracing::info!(recipient = %recipient, chars = message.chars().count(), "sending WhatsApp message");
        self.invoke(
            SEND_MESSAGE,
            json!({ "recipient": recipient, "message": message }),
        )
    }

    /// Send the file at `media_path`, a path on the server's filesystem.
    pub fn send_file(&self, recipient: &str, media_path: &str) -> Result<ToolPayload> {
        tracing::info!(recipient = %recipient, path = %media_path, "sending WhatsApp file");
        self.invoke(
            SEND_FILE,
            json!({ "recipient": recipient, "media_path": media_path }),
        )
    }

    /// Download the media attached to a message; the status carries the
    /// local `file_path`.
    pub fn download_media(&self, message_id: &str, chat_jid: &str) -> Result<ToolPayload> {
        self.invoke(
            DOWNLOAD_MEDIA,
            json!({ "message_id": message_id, "chat_jid": chat_jid }),
        )
    }

    /// Messages received since the last check, optionally marking them seen.
    pub fn check_new_messages(&self, mark_as_seen: bool) -> Result<ToolPayload> {
        self.invoke(CHECK_NEW_MESSAGES, json!({ "mark_as_seen": mark_as_seen }))
    }

    /// Mark every current message as seen.
    pub fn mark_messages_as_seen(&self) -> Result<ToolPayload> {
        self.invoke(MARK_MESSAGES_AS_SEEN, json!({}))
    }

    /// The server's own tool listing (`tools/list`).
    pub fn get_available_tools(&self) -> Result<Vec<ToolInfo>> {
        self.client.list_tools()
    }

    /// Route a tool call chosen at runtime, e.g. by a language model.
    ///
    /// Arguments are validated locally before anything is sent: an unknown
    /// tool or a missing required string fails without touching the wire.
    pub fn dispatch(&self, tool: &str, arguments: Value) -> Result<ToolPayload> {
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(McpError::invalid_arguments(format!(
                    "arguments for '{}' must be an object, got {}",
                    tool, other
                )));
            }
        };

        tracing::debug!(tool = %tool, "dispatching WhatsApp tool");

        match tool {
            SEARCH_CONTACTS => self.search_contacts(&required_str(&args, "query")?),
            LIST_MESSAGES => self.list_messages(&from_args(tool, args)?),
            LIST_CHATS => self.list_chats(&from_args(tool, args)?),
            SEND_MESSAGE => self.send_message(
                &required_str(&args, "recipient")?,
                &required_str(&args, "message")?,
            ),
            SEND_FILE => self.send_file(
                &required_str(&args, "recipient")?,
                &required_str(&args, "media_path")?,
            ),
            DOWNLOAD_MEDIA => self.download_media(
                &required_str(&args, "message_id")?,
                &required_str(&args, "chat_jid")?,
            ),
            CHECK_NEW_MESSAGES => {
                let mark_as_seen = match args.get("mark_as_seen") {
                    None | Some(Value::Null) => true,
                    Some(Value::Bool(flag)) => *flag,
                    Some(other) => {
                        return Err(McpError::invalid_arguments(format!(
                            "'mark_as_seen' must be a boolean, got {}",
                            other
                        )));
                    }
                };
                self.check_new_messages(mark_as_seen)
            }
            MARK_MESSAGES_AS_SEEN => self.mark_messages_as_seen(),
            GET_AVAILABLE_TOOLS => {
                let tools = self.get_available_tools()?;
                Ok(ToolPayload::Structured(serde_json::to_value(tools)?))
            }
            _ => Err(McpError::UnknownTool(tool.to_string())),
        }
    }
}

fn required_str(args: &Map<String, Value>, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| McpError::invalid_arguments(format!("'{}' is required and must be a string", key)))
}

fn from_args<T: serde::de::DeserializeOwned>(tool: &str, args: Map<String, Value>) -> Result<T> {
    // Models often send explicit nulls for unset filters.
    let args: Map<String, Value> = args.into_iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::from_value(Value::Object(args))
        .map_err(|e| McpError::invalid_arguments(format!("invalid arguments for '{}': {}", tool, e)))
}
