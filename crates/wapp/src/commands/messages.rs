//! `wapp messages`.

use anyhow::Result;
use clap::Args;
use serde_json::Value;
use wapp_mcp::ListMessagesQuery;

use super::Context;
use super::output::{field, print_payload, truncate};
use super::session::with_whatsapp;

/// Arguments for `wapp messages`.
#[derive(Args, Debug)]
pub struct MessagesArgs {
    /// Only messages after this ISO-8601 timestamp
    #[arg(long)]
    pub after: Option<String>,

    /// Only messages before this ISO-8601 timestamp
    #[arg(long)]
    pub before: Option<String>,

    /// Only messages from this phone number
    #[arg(long)]
    pub sender: Option<String>,

    /// Only messages in this chat JID
    #[arg(long)]
    pub chat: Option<String>,

    /// Only messages containing this text
    #[arg(long, short)]
    pub query: Option<String>,

    /// Page size
    #[arg(long, default_value_t = wapp_mcp::tools::DEFAULT_LIMIT)]
    pub limit: u32,

    /// Page number, starting at 0
    #[arg(long, default_value_t = 0)]
    pub page: u32,
}

impl From<MessagesArgs> for ListMessagesQuery {
    fn from(args: MessagesArgs) -> Self {
        ListMessagesQuery {
            after: args.after,
            before: args.before,
            sender_phone_number: args.sender,
            chat_jid: args.chat,
            query: args.query,
            limit: args.limit,
            page: args.page,
        }
    }
}

pub fn run(args: MessagesArgs, ctx: &Context) -> Result<()> {
    let query = ListMessagesQuery::from(args);
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.list_messages(&query))?;
    print_payload(ctx, &payload, render_message)
}

pub(crate) fn render_message(message: &Value) -> String {
    let sender = if message.get("is_from_me").and_then(Value::as_bool) == Some(true) {
        "me"
    } else {
        field(message, "sender")
    };
    format!(
        "[{}] {}: {}",
        field(message, "timestamp"),
        sender,
        truncate(field(message, "content"), 120)
    )
}
