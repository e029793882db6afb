//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]                 # how to reach the WhatsApp MCP server
//! [server.env]             # extra environment for a spawned server
//! [logging]                # optional JSON log file
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Token value shipped in sample configs; never sent as a credential.
pub const PLACEHOLDER_TOKEN: &str = "your-secret-token-here";

/// Server name used in logs when none is configured.
pub const DEFAULT_SERVER_NAME: &str = "whatsapp";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WappConfig {
    /// MCP server connection.
    pub server: Option<ServerSection>,
    /// Log output.
    pub logging: Option<LoggingSection>,
}

impl WappConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// `[server]` merges key by key so a project file can override the URL
    /// while the token stays in the user config.
    pub fn merge(&mut self, other: WappConfig) {
        if let Some(over) = other.server {
            match self.server.as_mut() {
                Some(base) => base.merge(over),
                None => self.server = Some(over),
            }
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[server]` section, creating an empty one if needed.
    pub fn server_mut(&mut self) -> &mut ServerSection {
        self.server.get_or_insert_with(ServerSection::default)
    }

    /// Directory for JSON log files, if configured.
    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.as_ref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [server]
// ─────────────────────────────────────────────────────────────────────────────

/// Which transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Http,
}

/// The `[server]` section. Every key is optional at the file level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Logical server name, used in logs.
    pub name: Option<String>,
    /// Explicit transport; inferred from `url`/`command` when unset.
    pub transport: Option<TransportKind>,
    /// Executable for stdio.
    pub command: Option<String>,
    /// Arguments for stdio.
    pub args: Option<Vec<String>>,
    /// Extra environment for the spawned server.
    pub env: Option<BTreeMap<String, String>>,
    /// Force UTF-8 stdio in Python servers. Defaults to true.
    pub force_utf8: Option<bool>,
    /// Endpoint for HTTP.
    pub url: Option<String>,
    /// Bearer token for HTTP.
    pub auth_token: Option<String>,
    /// Routing hint sent with every `tools/call`.
    pub server_name: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// How long a spawned server must stay up to count as started.
    pub startup_grace_ms: Option<u64>,
    /// Graceful shutdown wait before the server is killed.
    pub shutdown_timeout_secs: Option<u64>,
}

impl ServerSection {
    /// Overlay every key set in `other`.
    pub fn merge(&mut self, other: ServerSection) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        overlay!(
            name,
            transport,
            command,
            args,
            force_utf8,
            url,
            auth_token,
            server_name,
            timeout_secs,
            startup_grace_ms,
            shutdown_timeout_secs
        );

        if let Some(env) = other.env {
            self.env.get_or_insert_with(BTreeMap::new).extend(env);
        }
    }

    /// The configured token, unless it is empty or the sample placeholder.
    pub fn effective_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| is_real_token(t))
    }

    /// Explicit transport, else HTTP when only a URL is set, else stdio.
    pub fn effective_transport(&self) -> TransportKind {
        match (self.transport, &self.url, &self.command) {
            (Some(kind), _, _) => kind,
            (None, Some(_), None) => TransportKind::Http,
            _ => TransportKind::Stdio,
        }
    }

    /// Validate and produce connection settings.
    pub fn resolve(&self) -> Result<ResolvedServer> {
        let endpoint = match self.effective_transport() {
            TransportKind::Stdio => {
                let command = self
                    .command
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingField {
                        field: "command".to_string(),
                        context: "[server] (stdio transport)".to_string(),
                    })?;

                let mut env: Vec<(String, String)> = self
                    .env
                    .iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if self.force_utf8.unwrap_or(true) {
                    for (key, value) in [("PYTHONIOENCODING", "utf-8"), ("PYTHONUTF8", "1")] {
                        if !env.iter().any(|(k, _)| k == key) {
                            env.push((key.to_string(), value.to_string()));
                        }
                    }
                }

                Endpoint::Stdio {
                    command,
                    args: self.args.clone().unwrap_or_default(),
                    env,
                }
            }
            TransportKind::Http => {
                let url = self
                    .url
                    .clone()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingField {
                        field: "url".to_string(),
                        context: "[server] (http transport)".to_string(),
                    })?;
                Endpoint::Http {
                    url,
                    auth_token: self.effective_token().map(str::to_string),
                }
            }
        };

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(ResolvedServer {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            endpoint,
            server_name: self.server_name.clone().filter(|s| !s.is_empty()),
            timeout: self.timeout_secs.map(Duration::from_secs),
            startup_grace: self.startup_grace_ms.map(Duration::from_millis),
            shutdown_timeout: self.shutdown_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// True unless the token is blank or the sample placeholder.
pub fn is_real_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token != PLACEHOLDER_TOKEN
}

/// Where the server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Spawn a local process.
    Stdio {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
    },
    /// Post to a remote gateway.
    Http {
        url: String,
        auth_token: Option<String>,
    },
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    pub name: String,
    pub endpoint: Endpoint,
    pub server_name: Option<String>,
    pub timeout: Option<Duration>,
    pub startup_grace: Option<Duration>,
    pub shutdown_timeout: Option<Duration>,
}

// ─────────────────────────────────────────────────────────────────────────────
// [logging]
// ─────────────────────────────────────────────────────────────────────────────

/// The `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for daily-rolling JSON log files.
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = WappConfig::from_toml("").unwrap();
        assert_eq!(config, WappConfig::new());
        assert!(config.log_dir().is_none());
    }

    #[test]
    fn test_parse_full_server_section() {
        let config = WappConfig::from_toml(
            r#"
[server]
name = "whatsapp"
transport = "stdio"
command = "uv"
args = ["--directory", "/srv/whatsapp-mcp-server", "run", "main.py"]
timeout_secs = 45
startup_grace_ms = 500

[server.env]
WHATSAPP_DB = "/srv/store/messages.db"

[logging]
dir = "/var/log/wapp"
"#,
        )
        .unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.transport, Some(TransportKind::Stdio));
        assert_eq!(server.args.as_ref().unwrap().len(), 4);
        assert_eq!(
            server.env.as_ref().unwrap()["WHATSAPP_DB"],
            "/srv/store/messages.db"
        );
        assert_eq!(config.log_dir(), Some(&PathBuf::from("/var/log/wapp")));
    }

    #[test]
    fn test_unknown_transport_is_parse_error() {
        let err = WappConfig::from_toml("[server]\ntransport = \"carrier-pigeon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_server_key_by_key() {
        let mut base = WappConfig::from_toml(
            r#"
[server]
url = "https://old.example.com/"
auth_token = "tok"
[server.env]
A = "1"
"#,
        )
        .unwrap();
        let over = WappConfig::from_toml(
            r#"
[server]
url = "https://new.example.com/"
[server.env]
B = "2"
"#,
        )
        .unwrap();

        base.merge(over);
        let server = base.server.unwrap();
        assert_eq!(server.url.as_deref(), Some("https://new.example.com/"));
        assert_eq!(server.auth_token.as_deref(), Some("tok"));
        assert_eq!(server.env.unwrap().len(), 2);
    }

    #[test]
    fn test_merge_into_empty() {
        let mut base = WappConfig::new();
        base.merge(WappConfig::from_toml("[logging]\ndir = \"/tmp/logs\"").unwrap());
        assert!(base.server.is_none());
        assert!(base.log_dir().is_some());
    }

    #[test]
    fn test_placeholder_token_is_absent() {
        let mut server = ServerSection {
            auth_token: Some(PLACEHOLDER_TOKEN.to_string()),
            ..Default::default()
        };
        assert!(server.effective_token().is_none());

        server.auth_token = Some("   ".to_string());
        assert!(server.effective_token().is_none());

        server.auth_token = Some("abc123".to_string());
        assert_eq!(server.effective_token(), Some("abc123"));
    }

    #[test]
    fn test_transport_inference() {
        let http = ServerSection {
            url: Some("https://x.ngrok-free.app/".to_string()),
            ..Default::default()
        };
        assert_eq!(http.effective_transport(), TransportKind::Http);

        let both = ServerSection {
            url: Some("https://x.ngrok-free.app/".to_string()),
            command: Some("uv".to_string()),
            ..Default::default()
        };
        assert_eq!(both.effective_transport(), TransportKind::Stdio);

        assert_eq!(
            ServerSection::default().effective_transport(),
            TransportKind::Stdio
        );
    }

    #[test]
    fn test_resolve_stdio_adds_utf8_env() {
        let server = ServerSection {
            command: Some("uv".to_string()),
            env: Some(BTreeMap::from([(
                "PYTHONIOENCODING".to_string(),
                "latin-1".to_string(),
            )])),
            ..Default::default()
        };
        let resolved = server.resolve().unwrap();
        assert_eq!(resolved.name, DEFAULT_SERVER_NAME);

        let Endpoint::Stdio { command, env, .. } = resolved.endpoint else {
            panic!("expected stdio endpoint");
        };
        assert_eq!(command, "uv");
        // An explicit value wins over the forced default.
        assert!(env.contains(&("PYTHONIOENCODING".to_string(), "latin-1".to_string())));
        assert!(env.contains(&("PYTHONUTF8".to_string(), "1".to_string())));
    }

    #[test]
    fn test_resolve_stdio_without_utf8() {
        let server = ServerSection {
            command: Some("node".to_string()),
            force_utf8: Some(false),
            ..Default::default()
        };
        let Endpoint::Stdio { env, .. } = server.resolve().unwrap().endpoint else {
            panic!("expected stdio endpoint");
        };
        assert!(env.is_empty());
    }

    #[test]
    fn test_resolve_http() {
        let server = ServerSection {
            transport: Some(TransportKind::Http),
            url: Some("https://x.ngrok-free.app/".to_string()),
            auth_token: Some(PLACEHOLDER_TOKEN.to_string()),
            server_name: Some("whatsapp-mcp-remote".to_string()),
            timeout_secs: Some(30),
            ..Default::default()
        };
        let resolved = server.resolve().unwrap();
        assert_eq!(
            resolved.endpoint,
            Endpoint::Http {
                url: "https://x.ngrok-free.app/".to_string(),
                auth_token: None
            }
        );
        assert_eq!(resolved.server_name.as_deref(), Some("whatsapp-mcp-remote"));
        assert_eq!(resolved.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_resolve_missing_fields() {
        let err = ServerSection::default().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "command"));

        let http = ServerSection {
            transport: Some(TransportKind::Http),
            ..Default::default()
        };
        let err = http.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "url"));
    }

    #[test]
    fn test_resolve_zero_timeout() {
        let server = ServerSection {
            command: Some("uv".to_string()),
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            server.resolve(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
