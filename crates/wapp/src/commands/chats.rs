//! `wapp chats`.

use anyhow::Result;
use clap::Args;
use serde_json::Value;
use wapp_mcp::ListChatsQuery;

use super::Context;
use super::output::{field, print_payload, truncate};
use super::session::with_whatsapp;

/// Arguments for `wapp chats`.
#[derive(Args, Debug)]
pub struct ChatsArgs {
    /// Only chats whose name or JID matches
    #[arg(long, short)]
    pub query: Option<String>,

    /// Page size
    #[arg(long, default_value_t = wapp_mcp::tools::DEFAULT_LIMIT)]
    pub limit: u32,

    /// Page number, starting at 0
    #[arg(long, default_value_t = 0)]
    pub page: u32,

    /// Leave out each chat's last message
    #[arg(long)]
    pub no_last_message: bool,

    /// Sort field
    #[arg(long, default_value = wapp_mcp::tools::DEFAULT_SORT_BY)]
    pub sort_by: String,
}

impl From<ChatsArgs> for ListChatsQuery {
    fn from(args: ChatsArgs) -> Self {
        ListChatsQuery {
            query: args.query,
            limit: args.limit,
            page: args.page,
            include_last_message: !args.no_last_message,
            sort_by: args.sort_by,
        }
    }
}

pub fn run(args: ChatsArgs, ctx: &Context) -> Result<()> {
    let query = ListChatsQuery::from(args);
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.list_chats(&query))?;
    print_payload(ctx, &payload, render_chat)
}

fn render_chat(chat: &Value) -> String {
    let mut line = format!(
        "{:<28} {:<32} {}",
        field(chat, "name"),
        field(chat, "jid"),
        field(chat, "last_message_time")
    );
    let last = field(chat, "last_message");
    if !last.is_empty() {
        line.push_str("\n    ");
        line.push_str(&truncate(last, 80));
    }
    line
}
