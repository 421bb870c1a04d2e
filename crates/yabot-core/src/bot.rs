//! The bot handle used by handlers.
//!
//! [`Bot`] is a cheap-to-clone handle bundling the transport with the per-user
//! stores. Sending never fails loudly: transport errors are logged and turned
//! into `None`, so a lost reply never aborts a handler.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::keyboard::Keyboard;
use crate::scope;
use crate::state::{FsmStore, StateLabel, UserData, UserDataStore};
use crate::transport::{BoxedTransport, OutgoingText, Transport};

struct BotInner {
    transport: BoxedTransport,
    fsm: FsmStore,
    users: UserDataStore,
}

/// Handle to the running bot.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Creates a bot with empty stores.
    pub fn new<T: Transport>(transport: T) -> Self {
        Self::from_transport(Arc::new(transport))
    }

    /// Creates a bot from an already shared transport.
    pub fn from_transport(transport: BoxedTransport) -> Self {
        Self {
            inner: Arc::new(BotInner {
                transport,
                fsm: FsmStore::new(),
                users: UserDataStore::new(),
            }),
        }
    }

    /// The bot bound to the current scope.
    ///
    /// `None` outside event handling, including in tasks spawned by handlers.
    pub fn current() -> Option<Self> {
        scope::current_bot()
    }

    /// Login of the sender currently being handled.
    pub fn current_login(&self) -> Option<String> {
        scope::current_sender()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &BoxedTransport {
        &self.inner.transport
    }

    /// The FSM store.
    pub fn fsm(&self) -> &FsmStore {
        &self.inner.fsm
    }

    /// The FSM label of `login`.
    pub fn state(&self, login: &str) -> Option<StateLabel> {
        self.inner.fsm.get(login)
    }

    /// Sets or clears the FSM label of `login`.
    pub fn set_state<S: Into<StateLabel>>(&self, login: &str, state: Option<S>) {
        self.inner.fsm.set(login, state);
    }

    /// Free-form data of `login`, created on first use.
    pub fn user_data(&self, login: &str) -> UserData {
        self.inner.users.entry(login)
    }

    /// Sends `text` to `login`, returning the new message id.
    pub async fn send_message(
        &self,
        login: &str,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Option<i64> {
        let message = OutgoingText::new(login, text, keyboard);
        match self.inner.transport.send_text(&message).await {
            Ok(id) => {
                debug!(login = %login, message_id = ?id, "Message sent");
                id
            }
            Err(e) => {
                error!(login = %login, error = %e, "Failed to send message");
                None
            }
        }
    }

    /// Replies to the sender of the current scope.
    ///
    /// Outside a scope this logs a warning and returns `None`.
    pub async fn reply(&self, text: &str, keyboard: Option<Keyboard>) -> Option<i64> {
        let Some(login) = scope::current_sender() else {
            warn!("reply() called outside of event handling");
            return None;
        };
        self.send_message(&login, text, keyboard).await
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("fsm", &self.inner.fsm)
            .field("users", &self.inner.users)
            .finish_non_exhaustive()
    }
}
