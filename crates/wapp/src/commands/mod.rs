//! CLI command handlers.

pub mod call;
pub mod chats;
pub mod config;
pub mod contacts;
pub mod inbox;
pub mod info;
pub mod media;
pub mod messages;
pub mod output;
pub mod send;
pub mod session;
pub mod tools;

use wapp_config::{LoadedConfig, WappConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration after files, environment, and CLI overrides.
    pub loaded: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The effective configuration.
    pub fn config(&self) -> &WappConfig {
        &self.loaded.config
    }
}
