//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/wapp/config.toml` (user config)
//! 2. `./wapp.toml` (project-local), or an explicit `--config` file
//! 3. Environment variables (`WAPP_MCP_URL`, `MCP_AUTH_TOKEN`, ...)
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TransportKind, WappConfig, is_real_token};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "wapp.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "wapp";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "WAPP_CONFIG_DIR";

/// Selects HTTP transport and sets the endpoint.
pub const URL_ENV: &str = "WAPP_MCP_URL";
/// Bearer token for HTTP transport.
pub const TOKEN_ENV: &str = "MCP_AUTH_TOKEN";
/// Selects stdio transport and sets the executable.
pub const COMMAND_ENV: &str = "WAPP_MCP_COMMAND";
/// Request timeout in seconds.
pub const TIMEOUT_ENV: &str = "WAPP_MCP_TIMEOUT_SECS";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: WappConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<&'static str>,
    /// Warnings generated during loading (e.g., plaintext tokens).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from files and the process environment.
///
/// `config_file` replaces the project-local `./wapp.toml`; unlike discovered
/// files, it must exist and parse.
pub fn load_config(config_file: Option<&Path>) -> Result<LoadedConfig> {
    let mut loaded = load_config_with_options(None, None, config_file)?;
    apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());
    Ok(loaded)
}

/// Load file layers with explicit control over every location.
///
/// `config_dir` overrides both `WAPP_CONFIG_DIR` and the platform default.
/// The environment is not consulted for values; see [`apply_env_overrides`].
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = WappConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config: explicit override, then env var, then platform default
    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Explicit file, or project-local config
    match config_file {
        Some(path) => {
            config.merge(load_config_file(path)?);
            sources.push(ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            });
        }
        None => {
            let project_path = project_dir
                .map(|d| d.join(PROJECT_CONFIG_FILE))
                .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
            sources.push(load_layer(&mut config, &project_path, &mut warnings));
        }
    }

    check_plaintext_token(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides: Vec::new(),
        warnings,
    })
}

/// Apply environment overrides on top of the file layers.
///
/// `lookup` abstracts `std::env::var` so callers can inject values.
pub fn apply_env_overrides<F>(loaded: &mut LoadedConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(command) = get(COMMAND_ENV) {
        let server = loaded.config.server_mut();
        server.command = Some(command);
        server.transport = Some(TransportKind::Stdio);
        loaded.env_overrides.push(COMMAND_ENV);
    }

    if let Some(url) = get(URL_ENV) {
        let server = loaded.config.server_mut();
        server.url = Some(url);
        server.transport = Some(TransportKind::Http);
        loaded.env_overrides.push(URL_ENV);
    }

    if let Some(token) = get(TOKEN_ENV) {
        if is_real_token(&token) {
            loaded.config.server_mut().auth_token = Some(token);
            loaded.env_overrides.push(TOKEN_ENV);
        } else {
            loaded
                .warnings
                .push(format!("{} holds the sample placeholder; ignoring it", TOKEN_ENV));
        }
    }

    if let Some(raw) = get(TIMEOUT_ENV) {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                loaded.config.server_mut().timeout_secs = Some(secs);
                loaded.env_overrides.push(TIMEOUT_ENV);
            }
            _ => loaded.warnings.push(format!(
                "{}='{}' is not a positive number of seconds; ignoring it",
                TIMEOUT_ENV, raw
            )),
        }
    }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<WappConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    WappConfig::from_toml(&contents)
}

/// Get the user config file path.
///
/// Checks `WAPP_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/wapp/config.toml` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the user config directory for wapp.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
///
/// Missing files are skipped; broken ones become warnings.
fn load_layer(config: &mut WappConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

/// Warn when a usable token sits in a config file.
fn check_plaintext_token(config: &WappConfig, warnings: &mut Vec<String>) {
    if config
        .server
        .as_ref()
        .is_some_and(|s| s.effective_token().is_some())
    {
        warnings.push(format!(
            "[server] contains a plaintext auth_token. \
             Consider setting {} in the environment instead.",
            TOKEN_ENV
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
