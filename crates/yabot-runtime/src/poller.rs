//! Long-poll cursor over the Bot API.

use serde_json::Value;
use tracing::{debug, warn};

use yabot_core::BoxedTransport;

/// Fetches update batches and tracks the acknowledged `update_id`.
///
/// Each fetch asks for updates after the cursor. The cursor moves to the last
/// `update_id` of a non-empty batch and never moves back.
pub struct Poller {
    transport: BoxedTransport,
    limit: u32,
    cursor: i64,
}

impl Poller {
    pub fn new(transport: BoxedTransport, limit: u32) -> Self {
        Self {
            transport,
            limit,
            cursor: 0,
        }
    }

    /// Starts after `cursor` instead of from the beginning.
    pub fn with_cursor(mut self, cursor: i64) -> Self {
        self.cursor = cursor;
        self
    }

    /// The last acknowledged `update_id`.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Fetches the next batch. Transport errors are logged and yield an empty batch.
    pub async fn fetch(&mut self) -> Vec<Value> {
        let offset = self.cursor + 1;
        match self.transport.get_updates(offset, self.limit).await {
            Ok(updates) => {
                self.advance(&updates);
                updates
            }
            Err(e) if e.is_network() => {
                warn!(offset, error = %e, "Network error while polling, retrying after pause");
                Vec::new()
            }
            Err(e) => {
                warn!(offset, error = %e, "Polling failed, retrying after pause");
                Vec::new()
            }
        }
    }

    fn advance(&mut self, updates: &[Value]) {
        let last = updates
            .iter()
            .rev()
            .find_map(|u| u.get("update_id").and_then(Value::as_i64));
        if let Some(last) = last
            && last > self.cursor
        {
            debug!(from = self.cursor, to = last, "Cursor advanced");
            self.cursor = last;
        }
    }
}
