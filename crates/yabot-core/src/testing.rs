//! In-memory transport for tests and local experiments.
//!
//! [`RecordingTransport`] serves scripted update batches and records every
//! outgoing message instead of talking to the network.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::transport::{OutgoingText, Transport};

#[derive(Default)]
struct Recorded {
    batches: VecDeque<TransportResult<Vec<Value>>>,
    offsets: Vec<i64>,
    sent: Vec<OutgoingText>,
}

/// A [`Transport`] that replays scripted batches and records sends.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    next_id: Arc<AtomicI64>,
    fail_sends: Arc<AtomicBool>,
}

impl RecordingTransport {
    /// Creates a transport with no scripted batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a batch to be returned by the next `get_updates` call.
    pub fn push_batch(&self, batch: Vec<Value>) {
        self.recorded.lock().batches.push_back(Ok(batch));
    }

    /// Queues a failure to be returned by the next `get_updates` call.
    pub fn push_error(&self, error: TransportError) {
        self.recorded.lock().batches.push_back(Err(error));
    }

    /// Makes every following `send_text` call fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Messages sent so far, in send order.
    pub fn sent(&self) -> Vec<OutgoingText> {
        self.recorded.lock().sent.clone()
    }

    /// Texts sent so far, in send order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.recorded
            .lock()
            .sent
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    /// Offsets passed to `get_updates`, in call order.
    pub fn offsets(&self) -> Vec<i64> {
        self.recorded.lock().offsets.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get_updates(&self, offset: i64, limit: u32) -> TransportResult<Vec<Value>> {
        let mut recorded = self.recorded.lock();
        recorded.offsets.push(offset);
        match recorded.batches.pop_front() {
            Some(Ok(mut batch)) => {
                batch.truncate(limit as usize);
                Ok(batch)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    async fn send_text(&self, message: &OutgoingText) -> TransportResult<Option<i64>> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                status: 500,
                body: "send disabled".into(),
            });
        }
        self.recorded.lock().sent.push(message.clone());
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }
}
