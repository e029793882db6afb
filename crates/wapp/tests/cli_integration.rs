//! CLI integration tests for the wapp command-line interface.
//!
//! These tests verify:
//! - Help text and argument parsing
//! - Configuration errors are reported before any server is contacted
//! - End-to-end commands against the mock WhatsApp server, when it is built
//!
//! Every test runs in a scratch directory with an empty user config dir so
//! the developer's own configuration never leaks in.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `wapp` command isolated from the caller's config and environment.
fn wapp(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wapp").unwrap();
    cmd.current_dir(home.path())
        .env("WAPP_CONFIG_DIR", home.path().join("user"))
        .env_remove("WAPP_MCP_URL")
        .env_remove("WAPP_MCP_COMMAND")
        .env_remove("MCP_AUTH_TOKEN")
        .env_remove("WAPP_MCP_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

/// The mock server binary from the wapp-mcp crate, if it has been built.
fn mock_server_path() -> Option<PathBuf> {
    let path = assert_cmd::cargo::cargo_bin("mock-whatsapp-server");
    path.exists().then_some(path)
}

/// Write a project config that spawns the mock server with `args`.
fn write_mock_config(dir: &Path, server: &Path, args: &[&str]) {
    write_mock_config_with_grace(dir, server, args, 200);
}

fn write_mock_config_with_grace(dir: &Path, server: &Path, args: &[&str], grace_ms: u64) {
    let args = args
        .iter()
        .map(|a| format!("'{}'", a))
        .collect::<Vec<_>>()
        .join(", ");
    std::fs::write(
        dir.join("wapp.toml"),
        format!(
            "[server]\ncommand = '{}'\nargs = [{}]\nstartup_grace_ms = {}\nshutdown_timeout_secs = 2\n",
            server.display(),
            args,
            grace_ms
        ),
    )
    .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WhatsApp"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wapp"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("contacts"))
        .stdout(predicate::str::contains("messages"))
        .stdout(predicate::str::contains("chats"))
        .stdout(predicate::str::contains("send-file"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("mark-seen"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn test_send_requires_recipient_and_message() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["send", "51959812636"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<MESSAGE>"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_catalogue_needs_no_server() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["--json", "catalogue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"send_message\""))
        .stdout(predicate::str::contains("inputSchema"));
}

#[test]
fn test_call_rejects_invalid_json() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["call", "search_contacts", "{query"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valid JSON"));
}

#[test]
fn test_missing_server_config() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["contacts", "Ana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable MCP server"));
}

#[test]
fn test_missing_explicit_config_file() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["--config", "does-not-exist.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_config_shows_env_override() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .env("WAPP_MCP_URL", "https://abc.ngrok-free.app/")
        .env("MCP_AUTH_TOKEN", "your-secret-token-here")
        .args(["--json", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"transport\": \"http\""))
        .stdout(predicate::str::contains("\"token\": false"))
        .stdout(predicate::str::contains("WAPP_MCP_URL"));
}

#[test]
fn test_unreachable_http_server() {
    let home = TempDir::new().unwrap();
    wapp(&home)
        .args(["--url", "http://127.0.0.1:9/", "mark-seen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not reach MCP server"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Against the mock server
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_send_message_end_to_end() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &[]);

    wapp(&home)
        .args(["send", "51959812636", "Hola"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Message sent to 51959812636"));
}

#[test]
fn test_backend_failure_exits_non_zero() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &[]);

    wapp(&home)
        .args(["send", "000", "Hola"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recipient not found"));
}

#[test]
fn test_contacts_json() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &[]);

    wapp(&home)
        .args(["--json", "contacts", "Ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("51959812636@s.whatsapp.net"));
}

#[test]
fn test_call_dispatches_by_name() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &[]);

    wapp(&home)
        .args(["call", "list_chats", r#"{"limit": 1}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana Torres"))
        .stdout(predicate::str::contains("Proveedores").not());

    wapp(&home)
        .args(["call", "format_disk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tool"));
}

#[test]
fn test_info_over_stdio() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &[]);

    wapp(&home)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("mock-whatsapp-server v1.0.0"));
}

#[test]
fn test_launch_failure_is_reported() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config_with_grace(home.path(), &server, &["--exit-immediately"], 1000);

    wapp(&home)
        .args(["chats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not start MCP server"));
}

#[test]
fn test_tool_exception_exits_non_zero() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &["--tool-error", "send_message"]);

    wapp(&home)
        .args(["send", "51959812636", "Hola"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error executing tool send_message"));
}

#[test]
fn test_chatty_server_notifications_are_ignored() {
    let Some(server) = mock_server_path() else {
        eprintln!("Skipping test: mock-whatsapp-server not built");
        return;
    };
    let home = TempDir::new().unwrap();
    write_mock_config(home.path(), &server, &["--notify-before-reply"]);

    wapp(&home)
        .args(["contacts", "Ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana Torres"));
}
