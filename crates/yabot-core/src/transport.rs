//! The boundary between the dispatch core and the remote Bot API.
//!
//! The core never builds URLs or headers itself; it talks to a [`Transport`].
//! `yabot-transport` ships the HTTP implementation, tests use in-memory doubles.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::TransportResult;
use crate::keyboard::{Button, Keyboard};

/// Body of a `sendText` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingText {
    /// Recipient login.
    pub login: String,
    /// Message text.
    pub text: String,
    /// Flattened inline keyboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_keyboard: Option<Vec<Button>>,
}

impl OutgoingText {
    /// Creates a message, flattening the keyboard if one is given.
    pub fn new(login: impl Into<String>, text: impl Into<String>, keyboard: Option<Keyboard>) -> Self {
        Self {
            login: login.into(),
            text: text.into(),
            inline_keyboard: keyboard.map(Keyboard::into_buttons),
        }
    }
}

/// Remote Bot API operations used by the client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetches up to `limit` updates with id `>= offset`, in id order.
    async fn get_updates(&self, offset: i64, limit: u32) -> TransportResult<Vec<Value>>;

    /// Sends a text message and returns the new message id, if reported.
    async fn send_text(&self, message: &OutgoingText) -> TransportResult<Option<i64>>;
}

/// A shared, type-erased transport.
pub type BoxedTransport = Arc<dyn Transport>;
