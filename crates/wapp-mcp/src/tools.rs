//! The WhatsApp tool surface: names and JSON-schema descriptors.
//!
//! An orchestrator hands [`tool_catalogue`] to its language model, lets the
//! model pick a tool, then routes the call through
//! [`WhatsAppClient::dispatch`](crate::WhatsAppClient::dispatch).

use serde_json::{Value, json};

use crate::protocol::ToolInfo;

pub const SEARCH_CONTACTS: &str = "search_contacts";
pub const LIST_MESSAGES: &str = "list_messages";
pub const LIST_CHATS: &str = "list_chats";
pub const SEND_MESSAGE: &str = "send_message";
pub const SEND_FILE: &str = "send_file";
pub const DOWNLOAD_MEDIA: &str = "download_media";
pub const CHECK_NEW_MESSAGES: &str = "check_new_messages";
pub const MARK_MESSAGES_AS_SEEN: &str = "mark_messages_as_seen";

/// Every tool routed through `tools/call`.
pub const TOOL_NAMES: [&str; 8] = [
    SEARCH_CONTACTS,
    LIST_MESSAGES,
    LIST_CHATS,
    SEND_MESSAGE,
    SEND_FILE,
    DOWNLOAD_MEDIA,
    CHECK_NEW_MESSAGES,
    MARK_MESSAGES_AS_SEEN,
];

/// Default page size for list operations.
pub const DEFAULT_LIMIT: u32 = 20;

/// Default chat ordering.
pub const DEFAULT_SORT_BY: &str = "last_active";

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolInfo {
    ToolInfo {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: Some(json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })),
    }
}

/// Schema descriptors for every WhatsApp tool.
pub fn tool_catalogue() -> Vec<ToolInfo> {
    vec![
        tool(
            SEARCH_CONTACTS,
            "Search WhatsApp contacts by name or phone number",
            json!({
                "query": {
                    "type": "string",
                    "description": "Search term to match against contact names or phone numbers"
                }
            }),
            &["query"],
        ),
        tool(
            LIST_MESSAGES,
            "Get WhatsApp messages matching specified criteria",
            json!({
                "after": {
                    "type": "string",
                    "description": "ISO-8601 timestamp; only return messages after this date"
                },
                "before": {
                    "type": "string",
                    "description": "ISO-8601 timestamp; only return messages before this date"
                },
                "sender_phone_number": {
                    "type": "string",
                    "description": "Phone number to filter messages by sender"
                },
                "chat_jid": {
                    "type": "string",
                    "description": "Chat JID to filter messages by chat"
                },
                "query": {
                    "type": "string",
                    "description": "Search term to filter messages by content"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of messages to return",
                    "default": DEFAULT_LIMIT
                },
                "page": {
                    "type": "integer",
                    "description": "Page number for pagination",
                    "default": 0
                }
            }),
            &[],
        ),
        tool(
            LIST_CHATS,
            "Get WhatsApp chats matching specified criteria",
            json!({
                "query": {
                    "type": "string",
                    "description": "Search term to filter chats by name or JID"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of chats to return",
                    "default": DEFAULT_LIMIT
                },
                "page": {
                    "type": "integer",
                    "description": "Page number for pagination",
                    "default": 0
                },
                "include_last_message": {
                    "type": "boolean",
                    "description": "Whether to include the last message in each chat",
                    "default": true
                },
                "sort_by": {
                    "type": "string",
                    "description": "Field to sort results by",
                    "default": DEFAULT_SORT_BY
                }
            }),
            &[],
        ),
        tool(
            SEND_MESSAGE,
            "Send a WhatsApp message to a person or group",
            json!({
                "recipient": {
                    "type": "string",
                    "description": "Phone number with country code (e.g. '51959812636') or JID"
                },
                "message": {
                    "type": "string",
                    "description": "The message text to send"
                }
            }),
            &["recipient", "message"],
        ),
        tool(
            SEND_FILE,
            "Send a file via WhatsApp",
            json!({
                "recipient": {
                    "type": "string",
                    "description": "Phone number with country code or JID"
                },
                "media_path": {
                    "type": "string",
                    "description": "Absolute path to the media file"
                }
            }),
            &["recipient", "media_path"],
        ),
        tool(
            DOWNLOAD_MEDIA,
            "Download media from a WhatsApp message",
            json!({
                "message_id": {
                    "type": "string",
                    "description": "ID of the message containing the media"
                },
                "chat_jid": {
                    "type": "string",
                    "description": "JID of the chat containing the message"
                }
            }),
            &["message_id", "chat_jid"],
        ),
        tool(
            CHECK_NEW_MESSAGES,
            "Check for WhatsApp messages that arrived since the last check",
            json!({
                "mark_as_seen": {
                    "type": "boolean",
                    "description": "Whether to mark the returned messages as seen",
                    "default": true
                }
            }),
            &[],
        ),
        tool(
            MARK_MESSAGES_AS_SEEN,
            "Mark all current messages as seen so they are skipped by future checks",
            json!({}),
            &[],
        ),
    ]
}

/// Look up one descriptor by name.
pub fn find_tool(name: &str) -> Option<ToolInfo> {
    tool_catalogue().into_iter().find(|t| t.name == name)
}
