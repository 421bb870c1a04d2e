//! Handler specs, their builders and the ordered registry.
//!
//! Handlers are registered in four independent, append-only lists: message,
//! button, callback and default. Within a list, registration order is match
//! priority. A [`Router`] is just a registry meant to be merged into another
//! one with [`Registry::include`], which appends its lists in order.
//!
//! ```rust,ignore
//! let menu = Router::new()
//!     .with(on_text("/start").handler(start))
//!     .with(on_button("help").handler(help));
//!
//! let names = Router::new()
//!     .with(on_button("ask_name").handler(ask_name))
//!     .with(on_message().state(AppState::WaitName).handler(got_name));
//!
//! let registry = Registry::new().including(menu).including(names);
//! ```

use std::fmt;

use crate::handler::{BoxedHandler, Handler, into_boxed};
use crate::predicate::{Predicate, always};
use yabot_core::StateLabel;

// =============================================================================
// Specs
// =============================================================================

/// A text message handler.
#[derive(Clone)]
pub struct MessageSpec {
    /// Exact trimmed text to match.
    pub text: Option<String>,
    /// Extra condition.
    pub filter: Option<Predicate>,
    /// Required FSM label.
    pub state: Option<StateLabel>,
    /// Name used in logs.
    pub name: Option<String>,
    pub handler: BoxedHandler,
}

/// A button handler keyed by the payload command.
#[derive(Clone)]
pub struct ButtonSpec {
    /// Command without its leading slash.
    pub action: String,
    /// Required FSM label.
    pub state: Option<StateLabel>,
    /// Name used in logs.
    pub name: Option<String>,
    pub handler: BoxedHandler,
}

/// A catch-all button handler.
#[derive(Clone)]
pub struct CallbackSpec {
    /// Condition over the button event; defaults to [`always`].
    pub filter: Predicate,
    /// Name used in logs.
    pub name: Option<String>,
    pub handler: BoxedHandler,
}

/// A text handler tried after every message handler passed.
#[derive(Clone)]
pub struct DefaultSpec {
    /// Required FSM label.
    pub state: Option<StateLabel>,
    /// Name used in logs.
    pub name: Option<String>,
    pub handler: BoxedHandler,
}

/// Any registrable handler.
#[derive(Clone)]
pub enum HandlerSpec {
    Message(MessageSpec),
    Button(ButtonSpec),
    Callback(CallbackSpec),
    Default(DefaultSpec),
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(s) => f
                .debug_struct("Message")
                .field("name", &s.name)
                .field("text", &s.text)
                .field("state", &s.state)
                .field("filter", &s.filter.is_some())
                .finish(),
            Self::Button(s) => f
                .debug_struct("Button")
                .field("name", &s.name)
                .field("action", &s.action)
                .field("state", &s.state)
                .finish(),
            Self::Callback(s) => f.debug_struct("Callback").field("name", &s.name).finish(),
            Self::Default(s) => f
                .debug_struct("Default")
                .field("name", &s.name)
                .field("state", &s.state)
                .finish(),
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Starts a message handler matching any text.
pub fn on_message() -> MessageBuilder {
    MessageBuilder::default()
}

/// Starts a message handler matching exactly `text` (after trimming).
pub fn on_text(text: impl Into<String>) -> MessageBuilder {
    MessageBuilder {
        text: Some(text.into()),
        ..Default::default()
    }
}

/// Starts a button handler for `action`. A leading `/` is ignored.
pub fn on_button(action: impl AsRef<str>) -> ButtonBuilder {
    ButtonBuilder {
        action: {
            let action = action.as_ref();
            action.strip_prefix('/').unwrap_or(action).to_string()
        },
        state: None,
        name: None,
    }
}

/// Starts a callback handler matching every button press.
pub fn on_callback() -> CallbackBuilder {
    CallbackBuilder {
        filter: always(),
        name: None,
    }
}

/// Starts a default text handler.
pub fn on_default() -> DefaultBuilder {
    DefaultBuilder::default()
}

/// Builder for [`MessageSpec`].
#[derive(Default)]
pub struct MessageBuilder {
    text: Option<String>,
    filter: Option<Predicate>,
    state: Option<StateLabel>,
    name: Option<String>,
}

impl MessageBuilder {
    /// Only matches while the sender is in `state`.
    pub fn state(mut self, state: impl Into<StateLabel>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Adds a condition. Repeated calls are combined with `and`.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the handler, producing a [`HandlerSpec`].
    pub fn handler<H, T>(self, handler: H) -> HandlerSpec
    where
        H: Handler<T>,
        T: 'static,
    {
        HandlerSpec::Message(MessageSpec {
            text: self.text,
            filter: self.filter,
            state: self.state,
            name: self.name,
            handler: into_boxed(handler),
        })
    }
}

/// Builder for [`ButtonSpec`].
pub struct ButtonBuilder {
    action: String,
    state: Option<StateLabel>,
    name: Option<String>,
}

impl ButtonBuilder {
    /// Only matches while the sender is in `state`.
    pub fn state(mut self, state: impl Into<StateLabel>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the handler, producing a [`HandlerSpec`].
    pub fn handler<H, T>(self, handler: H) -> HandlerSpec
    where
        H: Handler<T>,
        T: 'static,
    {
        HandlerSpec::Button(ButtonSpec {
            action: self.action,
            state: self.state,
            name: self.name,
            handler: into_boxed(handler),
        })
    }
}

/// Builder for [`CallbackSpec`].
pub struct CallbackBuilder {
    filter: Predicate,
    name: Option<String>,
}

impl CallbackBuilder {
    /// Replaces the default always-true condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = predicate;
        self
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the handler, producing a [`HandlerSpec`].
    pub fn handler<H, T>(self, handler: H) -> HandlerSpec
    where
        H: Handler<T>,
        T: 'static,
    {
        HandlerSpec::Callback(CallbackSpec {
            filter: self.filter,
            name: self.name,
            handler: into_boxed(handler),
        })
    }
}

/// Builder for [`DefaultSpec`].
#[derive(Default)]
pub struct DefaultBuilder {
    state: Option<StateLabel>,
    name: Option<String>,
}

impl DefaultBuilder {
    /// Only matches while the sender is in `state`.
    pub fn state(mut self, state: impl Into<StateLabel>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the handler, producing a [`HandlerSpec`].
    pub fn handler<H, T>(self, handler: H) -> HandlerSpec
    where
        H: Handler<T>,
        T: 'static,
    {
        HandlerSpec::Default(DefaultSpec {
            state: self.state,
            name: self.name,
            handler: into_boxed(handler),
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered handler lists.
#[derive(Clone, Default)]
pub struct Registry {
    pub(crate) messages: Vec<MessageSpec>,
    pub(crate) buttons: Vec<ButtonSpec>,
    pub(crate) callbacks: Vec<CallbackSpec>,
    pub(crate) defaults: Vec<DefaultSpec>,
}

/// A group of handlers merged into a registry with [`Registry::include`].
pub type Router = Registry;

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a spec to its list.
    pub fn add(&mut self, spec: HandlerSpec) {
        match spec {
            HandlerSpec::Message(s) => self.messages.push(s),
            HandlerSpec::Button(s) => self.buttons.push(s),
            HandlerSpec::Callback(s) => self.callbacks.push(s),
            HandlerSpec::Default(s) => self.defaults.push(s),
        }
    }

    /// Appends a spec (builder pattern).
    pub fn with(mut self, spec: HandlerSpec) -> Self {
        self.add(spec);
        self
    }

    /// Appends every list of `router`, preserving its order.
    pub fn include(&mut self, router: Router) {
        self.messages.extend(router.messages);
        self.buttons.extend(router.buttons);
        self.callbacks.extend(router.callbacks);
        self.defaults.extend(router.defaults);
    }

    /// Appends a router (builder pattern).
    pub fn including(mut self, router: Router) -> Self {
        self.include(router);
        self
    }

    /// Message handlers in match order.
    pub fn messages(&self) -> &[MessageSpec] {
        &self.messages
    }

    /// Button handlers in match order.
    pub fn buttons(&self) -> &[ButtonSpec] {
        &self.buttons
    }

    /// Callback handlers in match order.
    pub fn callbacks(&self) -> &[CallbackSpec] {
        &self.callbacks
    }

    /// Default handlers in match order.
    pub fn defaults(&self) -> &[DefaultSpec] {
        &self.defaults
    }

    /// Total number of handlers.
    pub fn len(&self) -> usize {
        self.messages.len() + self.buttons.len() + self.callbacks.len() + self.defaults.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("messages", &self.messages.len())
            .field("buttons", &self.buttons.len())
            .field("callbacks", &self.callbacks.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}
