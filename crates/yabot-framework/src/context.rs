//! The context handed to middleware and handlers.
//!
//! One [`HandlerContext`] is built per handler invocation. It shares the event
//! and the bot with every other invocation for the same update, but carries
//! its own [`DataBag`]: writes made by outer middleware are seen by inner
//! middleware and by the handler, and vanish once the invocation ends.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use yabot_core::{Bot, InboundEvent};

// =============================================================================
// DataBag
// =============================================================================

/// Mutable key/value bag shared along one middleware chain.
#[derive(Clone, Default)]
pub struct DataBag(Arc<Mutex<Map<String, Value>>>);

impl DataBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.lock().get(key).cloned()
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.lock().insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.lock().remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.lock().contains_key(key)
    }

    /// Returns a copy of the bag contents.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.0.lock().clone()
    }
}

impl fmt::Debug for DataBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.lock().iter()).finish()
    }
}

// =============================================================================
// HandlerContext
// =============================================================================

/// Everything a handler invocation can see.
#[derive(Clone)]
pub struct HandlerContext {
    event: Arc<InboundEvent>,
    bot: Bot,
    data: DataBag,
}

impl HandlerContext {
    /// Creates a context with an empty data bag.
    pub fn new(event: Arc<InboundEvent>, bot: Bot) -> Self {
        Self {
            event,
            bot,
            data: DataBag::new(),
        }
    }

    /// The event being handled.
    pub fn event(&self) -> &Arc<InboundEvent> {
        &self.event
    }

    /// The bot handling the event.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// The data bag of this invocation.
    pub fn data(&self) -> &DataBag {
        &self.data
    }

    /// Login of the event sender.
    pub fn login(&self) -> &str {
        self.event.login()
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("update_id", &self.event.update_id())
            .field("kind", &self.event.kind())
            .field("sender", &self.event.login())
            .field("data", &self.data)
            .finish()
    }
}
