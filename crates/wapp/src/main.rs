//! wapp - WhatsApp from the command line, through an MCP server.
//!
//! Main entry point for the wapp CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

use commands::{call, chats, config, contacts, inbox, info, media, messages, send, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// wapp - WhatsApp automation over the Model Context Protocol
#[derive(Parser)]
#[command(name = "wapp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of ./wapp.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// MCP server URL (selects the HTTP transport)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Bearer token for the HTTP transport
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Directory for JSON log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tools the server exposes
    Tools,

    /// Print the built-in tool catalogue (no server needed)
    Catalogue,

    /// Search contacts by name or phone number
    Contacts(contacts::ContactsArgs),

    /// List messages
    Messages(messages::MessagesArgs),

    /// List chats
    Chats(chats::ChatsArgs),

    /// Send a text message
    Send(send::SendArgs),

    /// Send a file
    SendFile(send::SendFileArgs),

    /// Download media attached to a message
    Download(media::DownloadArgs),

    /// Show messages received since the last check
    Check(inbox::CheckArgs),

    /// Mark all current messages as seen
    MarkSeen,

    /// Call any tool by name with JSON arguments
    Call(call::CallArgs),

    /// Show information about the server
    Info,

    /// Show the effective configuration
    Config,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loaded =
        wapp_config::load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let log_dir = cli.log_dir.clone().or_else(|| loaded.config.log_dir().cloned());
    let _guard = init_tracing(cli.verbose, log_dir.as_deref())?;

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    if let Some(url) = cli.url {
        let server = loaded.config.server_mut();
        server.url = Some(url);
        server.transport = Some(wapp_config::TransportKind::Http);
    }
    if let Some(token) = cli.token {
        loaded.config.server_mut().auth_token = Some(token);
    }

    let ctx = commands::Context {
        loaded,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Tools => tools::run_tools(&ctx),
        Commands::Catalogue => tools::run_catalogue(&ctx),
        Commands::Contacts(args) => contacts::run(args, &ctx),
        Commands::Messages(args) => messages::run(args, &ctx),
        Commands::Chats(args) => chats::run(args, &ctx),
        Commands::Send(args) => send::run_send(args, &ctx),
        Commands::SendFile(args) => send::run_send_file(args, &ctx),
        Commands::Download(args) => media::run(args, &ctx),
        Commands::Check(args) => inbox::run_check(args, &ctx),
        Commands::MarkSeen => inbox::run_mark_seen(&ctx),
        Commands::Call(args) => call::run(args, &ctx),
        Commands::Info => info::run(&ctx),
        Commands::Config => config::run(&ctx),
    }
}

/// Console logging on stderr, plus a daily JSON file when `log_dir` is set.
///
/// `RUST_LOG` replaces the console default. The returned guard flushes the
/// file writer and must live until exit.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose {
        "wapp=debug,wapp_mcp=debug,wapp_config=debug,info"
    } else {
        "wapp=info,wapp_mcp=warn,wapp_config=warn,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(console_filter);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("wapp")
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("failed to open log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("wapp=trace,wapp_mcp=trace,wapp_config=trace,info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(guard)
}
