//! Stdio transport: a spawned server process spoken to over its pipes.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{Transport, TransportType};
use crate::error::{McpError, Result};

/// How often the child is polled while waiting for it to start or exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Number of stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 64;

/// How long to wait for the stderr reader to drain after an early exit.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for spawning a stdio MCP server.
#[derive(Debug, Clone)]
pub struct StdioConfig {
    /// Executable to run.
    pub command: String,
    /// Arguments to pass to the command.
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
    /// How long the child must stay alive after spawn to count as started.
    pub startup_grace: Duration,
    /// How long to wait for a graceful exit before killing the child.
    pub shutdown_timeout: Duration,
    /// Bound on each read; `None` blocks until a line or EOF.
    pub read_timeout: Option<Duration>,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            startup_grace: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
            read_timeout: None,
        }
    }
}

impl StdioConfig {
    /// Create a config for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the argument list.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Add an environment variable.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the startup grace period. Zero disables the liveness check.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Set the graceful shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Bound every read by `timeout`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// A running MCP server process with line-oriented pipes.
///
/// The transport exclusively owns the child. Dropping it runs [`close`],
/// so the process is reaped on every exit path.
///
/// [`close`]: StdioTransport::close
pub struct StdioTransport {
    command: String,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    lines: Receiver<std::io::Result<String>>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    read_timeout: Option<Duration>,
    shutdown_timeout: Duration,
}

impl StdioTransport {
    /// Spawn the server and verify it survives the startup grace period.
    pub fn start(config: &StdioConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            McpError::launch(format!("failed to spawn '{}': {}", config.command, e))
        })?;

        let pipes = (
            child.stdin.take(),
            child.stdout.take(),
            child.stderr.take(),
        );
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            reap(&mut child);
            return Err(McpError::launch("failed to capture child pipes"));
        };

        let stderr_tail = Arc::new(Mutex::new(VecDeque::new()));
        let (tx, lines) = mpsc::channel();

        let readers = spawn_stdout_reader(stdout, tx).and_then(|stdout_reader| {
            spawn_stderr_reader(stderr, config.command.clone(), Arc::clone(&stderr_tail))
                .map(|stderr_reader| (stdout_reader, stderr_reader))
        });
        let (_stdout_reader, stderr_reader) = match readers {
            Ok(handles) => handles,
            Err(e) => {
                reap(&mut child);
                return Err(McpError::launch(format!(
                    "failed to start pipe readers: {}",
                    e
                )));
            }
        };

        let early_exit = match wait_for_early_exit(&mut child, config.startup_grace) {
            Ok(status) => status,
            Err(e) => {
                reap(&mut child);
                return Err(McpError::launch(format!(
                    "failed to poll '{}': {}",
                    config.command, e
                )));
            }
        };

        if let Some(status) = early_exit {
            let deadline = Instant::now() + STDERR_DRAIN_TIMEOUT;
            while !stderr_reader.is_finished() && Instant::now() < deadline {
                thread::sleep(POLL_INTERVAL);
            }
            let stderr = stderr_tail.lock().iter().cloned().collect::<Vec<_>>();
            tracing::error!(
                command = %config.command,
                status = %status,
                "MCP server exited during startup"
            );
            let mut message = format!("'{}' exited during startup ({})", config.command, status);
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(&stderr.join("\n"));
            }
            return Err(McpError::Launch(message));
        }

        tracing::info!(
            command = %config.command,
            pid = child.id(),
            "spawned MCP server"
        );

        Ok(Self {
            command: config.command.clone(),
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            lines,
            stderr_tail,
            read_timeout: config.read_timeout,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Write one line and flush.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        if text.contains('\n') {
            return Err(McpError::protocol("message contains a newline"));
        }

        let stdin = self.stdin.as_mut().ok_or(McpError::ConnectionClosed)?;
        stdin
            .write_all(text.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush())
            .map_err(|e| McpError::transport(format!("failed to write to server: {}", e)))?;

        tracing::trace!(json = %text, "sent MCP message");
        Ok(())
    }

    /// Block until one full, non-blank line is available.
    ///
    /// Fails with [`McpError::ConnectionClosed`] on EOF and
    /// [`McpError::Timeout`] when the configured read timeout elapses.
    pub fn read_line(&mut self) -> Result<String> {
        loop {
            let received = match self.read_timeout {
                Some(timeout) => self.lines.recv_timeout(timeout).map_err(|e| match e {
                    RecvTimeoutError::Timeout => McpError::Timeout,
                    RecvTimeoutError::Disconnected => McpError::ConnectionClosed,
                })?,
                None => self.lines.recv().map_err(|_| McpError::ConnectionClosed)?,
            };

            let line = received
                .map_err(|e| McpError::transport(format!("failed to read from server: {}", e)))?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            tracing::trace!(json = %line, "received MCP message");
            return Ok(line.to_string());
        }
    }

    /// Stop the server: close stdin, wait, then force-kill.
    ///
    /// Always releases the process handle and never fails, even after an
    /// earlier transport error. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // EOF on stdin asks the server to exit on its own.
        drop(self.stdin.take());

        let deadline = Instant::now() + self.shutdown_timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!(command = %self.command, status = %status, "MCP server exited");
                    return Ok(());
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(command = %self.command, error = %e, "failed to poll MCP server");
                    break;
                }
            }
        }

        tracing::warn!(command = %self.command, "MCP server did not exit in time, killing");
        reap(&mut child);
        Ok(())
    }

    /// The last lines the server wrote to stderr.
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail.lock().iter().cloned().collect()
    }

    /// OS process id of the server, while it is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Check if the child process is still running.
    pub fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }
}

impl Transport for StdioTransport {
    fn kind(&self) -> TransportType {
        TransportType::Stdio
    }

    fn round_trip(&mut self, message: &str) -> Result<String> {
        self.write_line(message)?;
        self.read_line()
    }

    fn receive(&mut self) -> Result<String> {
        self.read_line()
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.write_line(message)
    }

    fn is_connected(&mut self) -> bool {
        self.is_running()
    }

    fn close(&mut self) -> Result<()> {
        StdioTransport::close(self)
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Kill and wait, ignoring errors (the child may already be gone).
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Poll the child for `grace`; return its exit status if it stopped.
fn wait_for_early_exit(
    child: &mut Child,
    grace: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    if grace.is_zero() {
        return Ok(None);
    }

    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Read stdout line by line into `tx` until EOF.
///
/// Invalid UTF-8 is replaced rather than treated as an error.
fn spawn_stdout_reader(
    stdout: impl Read + Send + 'static,
    tx: Sender<std::io::Result<String>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("mcp-stdout".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })
}

/// Forward stderr to tracing and keep the most recent lines.
fn spawn_stderr_reader(
    stderr: impl Read + Send + 'static,
    command: String,
    tail: Arc<Mutex<VecDeque<String>>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("mcp-stderr".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf)
                            .trim_end_matches(['\r', '\n'])
                            .to_string();
                        tracing::debug!(target: "wapp_mcp::stderr", command = %command, "{}", line);
                        let mut tail = tail.lock();
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> StdioConfig {
        StdioConfig::new("sh")
            .with_arg("-c")
            .with_arg(script)
            .with_startup_grace(Duration::from_millis(300))
            .with_shutdown_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_spawn_nonexistent_command() {
        let result = StdioTransport::start(&StdioConfig::new("nonexistent-mcp-server-12345"));
        match result {
            Ok(_) => panic!("Expected spawn to fail"),
            Err(err) => assert!(matches!(err, McpError::Launch(_))),
        }
    }

    #[test]
    fn test_config_builder() {
        let config = StdioConfig::new("uv")
            .with_arg("--directory")
            .with_arg("/srv/whatsapp-mcp-server")
            .with_env_var("PYTHONIOENCODING", "utf-8")
            .with_read_timeout(Duration::from_secs(10));

        assert_eq!(config.command, "uv");
        assert_eq!(config.args, vec!["--directory", "/srv/whatsapp-mcp-server"]);
        assert_eq!(
            config.env,
            vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())]
        );
        assert_eq!(config.startup_grace, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(10)));
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_is_launch_error_with_stderr() {
        let result = StdioTransport::start(&sh("echo 'missing module' >&2; exit 3"));
        match result {
            Err(McpError::Launch(msg)) => {
                assert!(msg.contains("exited during startup"), "{msg}");
                assert!(msg.contains("missing module"), "{msg}");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected launch failure"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_line_round_trip_with_cat() {
        let mut transport = StdioTransport::start(&StdioConfig::new("cat")).unwrap();
        assert!(transport.is_running());
        assert!(transport.pid().is_some());

        let reply = transport.round_trip(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert_eq!(reply, r#"{"jsonrpc":"2.0","id":1}"#);

        transport.close().unwrap();
        assert!(!transport.is_running());
        assert!(transport.pid().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_rejects_embedded_newline() {
        let mut transport = StdioTransport::start(&StdioConfig::new("cat")).unwrap();
        let err = transport.write_line("a\nb").unwrap_err();
        assert!(matches!(err, McpError::Protocol(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_blank_lines_are_skipped() {
        let mut transport =
            StdioTransport::start(&sh("printf '\\n  \\n{\"id\":1}\\n'; sleep 5")).unwrap();
        assert_eq!(transport.read_line().unwrap(), r#"{"id":1}"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_eof_is_connection_closed() {
        let mut transport =
            StdioTransport::start(&sh("read line; exit 0").with_startup_grace(Duration::ZERO))
                .unwrap();
        let err = transport.round_trip("{}").unwrap_err();
        assert!(matches!(err, McpError::ConnectionClosed));
        assert!(err.is_unreachable());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_timeout() {
        let mut transport = StdioTransport::start(
            &sh("sleep 5").with_read_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        let err = transport.read_line().unwrap_err();
        assert!(matches!(err, McpError::Timeout));
    }

    #[cfg(unix)]
    #[test]
    fn test_close_kills_unresponsive_server() {
        // Ignores stdin EOF, so close() must fall back to kill.
        let mut transport = StdioTransport::start(
            &sh("trap '' TERM; sleep 30").with_shutdown_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        let started = Instant::now();
        transport.close().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!transport.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn test_close_is_idempotent_after_pipe_failure() {
        let mut transport =
            StdioTransport::start(&sh("read line; exit 1").with_startup_grace(Duration::ZERO))
                .unwrap();
        assert!(transport.round_trip("{}").is_err());
        transport.close().unwrap();
        transport.close().unwrap();
        assert!(matches!(
            transport.write_line("{}"),
            Err(McpError::ConnectionClosed)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_tail_is_captured() {
        let mut transport =
            StdioTransport::start(&sh("echo ready >&2; sleep 5").with_startup_grace(
                Duration::from_millis(200),
            ))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while transport.stderr_tail().is_empty() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        assert_eq!(transport.stderr_tail(), vec!["ready".to_string()]);
        transport.close().unwrap();
    }
}
