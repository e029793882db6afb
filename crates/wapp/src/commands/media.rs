//! `wapp download`.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::output::{compact, print_payload};
use super::session::with_whatsapp;

/// Arguments for `wapp download`.
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// ID of the message carrying the media
    pub message_id: String,

    /// JID of the chat the message belongs to
    pub chat_jid: String,
}

pub fn run(args: DownloadArgs, ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| {
        whatsapp.download_media(&args.message_id, &args.chat_jid)
    })?;
    print_payload(ctx, &payload, compact)
}
