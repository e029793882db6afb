//! `wapp check` and `wapp mark-seen`.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::messages::render_message;
use super::output::print_payload;
use super::session::with_whatsapp;

/// Arguments for `wapp check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Leave the returned messages unseen
    #[arg(long)]
    pub keep_unseen: bool,
}

pub fn run_check(args: CheckArgs, ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.check_new_messages(!args.keep_unseen))?;
    print_payload(ctx, &payload, render_message)
}

pub fn run_mark_seen(ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.mark_messages_as_seen())?;
    print_payload(ctx, &payload, render_message)
}
