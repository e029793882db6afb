//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::transport::{Transport, TransportType};

/// Replays canned replies in order and records every message sent.
pub(crate) struct ScriptedTransport {
    kind: TransportType,
    replies: VecDeque<Result<String>>,
    pub(crate) sent: Arc<Mutex<Vec<Value>>>,
    pub(crate) closed: Arc<Mutex<u32>>,
}

impl ScriptedTransport {
    pub(crate) fn new(kind: TransportType) -> Self {
        Self {
            kind,
            replies: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(0)),
        }
    }

    pub(crate) fn reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push_back(Ok(text.into()));
        self
    }

    /// Queue a successful response to request `id`.
    pub(crate) fn result(self, id: u64, result: Value) -> Self {
        self.reply(serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string())
    }

    pub(crate) fn fail(mut self, err: McpError) -> Self {
        self.replies.push_back(Err(err));
        self
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportType {
        self.kind
    }

    fn round_trip(&mut self, message: &str) -> Result<String> {
        self.sent.lock().push(serde_json::from_str(message)?);
        self.replies
            .pop_front()
            .unwrap_or(Err(McpError::ConnectionClosed))
    }

    fn receive(&mut self) -> Result<String> {
        self.replies
            .pop_front()
            .unwrap_or(Err(McpError::ConnectionClosed))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.sent.lock().push(serde_json::from_str(message)?);
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        *self.closed.lock() == 0
    }

    fn close(&mut self) -> Result<()> {
        *self.closed.lock() += 1;
        Ok(())
    }
}
