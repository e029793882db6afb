//! Configuration for the WhatsApp MCP client.
//!
//! Provides TOML-based configuration with:
//! - A `[server]` section describing a stdio or HTTP MCP server
//! - Config file layering (user config + project-local overrides)
//! - Environment overrides for endpoint, token, and timeout
//! - Placeholder-token filtering and plaintext-token warnings

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    COMMAND_ENV, ConfigSource, LoadedConfig, TIMEOUT_ENV, TOKEN_ENV, URL_ENV,
    apply_env_overrides, load_config, load_config_file, load_config_with_options,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
