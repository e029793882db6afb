//! `wapp contacts <query>`.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use super::Context;
use super::output::{field, print_payload};
use super::session::with_whatsapp;

/// Arguments for `wapp contacts`.
#[derive(Args, Debug)]
pub struct ContactsArgs {
    /// Name or phone number fragment
    pub query: String,
}

pub fn run(args: ContactsArgs, ctx: &Context) -> Result<()> {
    let payload = with_whatsapp(ctx, |whatsapp| whatsapp.search_contacts(&args.query))?;
    print_payload(ctx, &payload, render_contact)
}

fn render_contact(contact: &Value) -> String {
    format!(
        "{:<28} {:<16} {}",
        field(contact, "name"),
        field(contact, "phone_number"),
        field(contact, "jid")
    )
}
