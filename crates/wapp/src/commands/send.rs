//! `wapp send` and `wapp send-file`.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::output::{compact, print_payload};
use super::session::with_whatsapp;

/// Arguments for `wapp send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Phone number with country code, or a JID
    pub recipient: String,

    /// Message text
    pub message: String,
}

/// Arguments for `wapp send-file`.
#[derive(Args, Debug)]
pub struct SendFileArgs {
    /// Phone number with country code, or a JID
    pub recipient: String,

    /// Absolute path to the file, as seen by the server
    pub path: String,
}

pub fn run_send(args: SendArgs, ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| {
        whatsapp.send_message(&args.recipient, &args.message)
    })?;
    print_payload(ctx, &payload, compact)
}

pub fn run_send_file(args: SendFileArgs, ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.send_file(&args.recipient, &args.path))?;
    print_payload(ctx, &payload, compact)
}
