//! Matching engine.
//!
//! The [`Dispatcher`] resolves at most one handler for each event and runs it
//! through the middleware chain, inside the `(bot, sender)` scope.
//!
//! # Text messages
//!
//! 1. Message handlers are tried in order. A handler is eligible when its
//!    state (if any) equals the sender's label, its text (if any) equals the
//!    trimmed text and its filter (if any) holds. The first eligible handler
//!    that neither declines nor fails handles the event.
//! 2. Otherwise the first default handler whose state matches and that does
//!    not fail handles it.
//! 3. Otherwise the "unknown text" reply is sent.
//!
//! # Button presses
//!
//! 1. The command is read from `payload.cmd`, then `payload.action`, with
//!    a single leading slash removed. The first button handler with that action and
//!    a matching state handles the event. If it fails, the "action error"
//!    reply is sent and dispatch stops.
//! 2. Otherwise the first callback handler whose filter holds and that does
//!    not fail handles it.
//! 3. Otherwise the "unknown action" reply is sent.
//!
//! Handler failures (errors, panics, extraction failures) are logged and
//! never leave the dispatcher.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower::ServiceExt;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use crate::context::HandlerContext;
use crate::error::{HandlerError, HandlerResult, Outcome};
use crate::handler::BoxedHandler;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::registry::{HandlerSpec, Registry, Router};
use yabot_core::{ActionEvent, Bot, InboundEvent, StateLabel, TextEvent, with_scope};

// =============================================================================
// FallbackReplies
// =============================================================================

/// Texts sent when nothing handles an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackReplies {
    /// Sent when no message or default handler handled a text.
    pub unknown_text: String,
    /// Sent when no button or callback handler handled a button press.
    pub unknown_action: String,
    /// Sent when a button handler failed.
    pub action_error: String,
}

impl Default for FallbackReplies {
    fn default() -> Self {
        Self {
            unknown_text: "I don't understand, try the main menu.".to_string(),
            unknown_action: "Unrecognized action.".to_string(),
            action_error: "Error while handling action.".to_string(),
        }
    }
}

// =============================================================================
// Dispatched
// =============================================================================

/// Handler category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Message,
    Button,
    Callback,
    Default,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Button => "button",
            Self::Callback => "callback",
            Self::Default => "default",
        })
    }
}

/// How an event was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The handler at `index` of the `kind` list handled the event.
    Handled { kind: HandlerKind, index: usize },
    /// The button handler at `index` failed; the action error reply was sent.
    ButtonFailed { index: usize },
    /// Nothing handled a text; the unknown text reply was sent.
    UnknownText,
    /// Nothing handled a button press; the unknown action reply was sent.
    UnknownAction,
}

// =============================================================================
// Dispatcher
// =============================================================================

struct Compiled<S> {
    spec: S,
    service: BoxedHandler,
}

/// Routes events to handlers.
///
/// Cheap to share behind an `Arc`; all state it reads lives in the [`Bot`].
pub struct Dispatcher {
    messages: Vec<Compiled<crate::registry::MessageSpec>>,
    buttons: Vec<Compiled<crate::registry::ButtonSpec>>,
    callbacks: Vec<Compiled<crate::registry::CallbackSpec>>,
    defaults: Vec<Compiled<crate::registry::DefaultSpec>>,
    replies: FallbackReplies,
}

impl Dispatcher {
    /// Creates a dispatcher with no middleware and default replies.
    pub fn new(registry: Registry) -> Self {
        Self::builder().router(registry).build()
    }

    /// Starts a builder.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The fallback replies in use.
    pub fn replies(&self) -> &FallbackReplies {
        &self.replies
    }

    /// Dispatches one event inside the `(bot, sender)` scope.
    pub async fn dispatch(&self, bot: &Bot, event: InboundEvent) -> Dispatched {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_id = event.update_id(),
            sender = %event.login(),
            kind = event.kind(),
        );
        let login = event.login().to_string();
        let event = Arc::new(event);

        with_scope(bot.clone(), login, self.route(bot, event))
            .instrument(span)
            .await
    }

    async fn route(&self, bot: &Bot, event: Arc<InboundEvent>) -> Dispatched {
        let state = bot.fsm().get(event.login());
        let dispatched = match event.as_ref() {
            InboundEvent::Text(text) => self.route_text(bot, &event, text, state.as_ref()).await,
            InboundEvent::Action(action) => {
                self.route_action(bot, &event, action, state.as_ref()).await
            }
        };
        debug!(result = ?dispatched, "Dispatch finished");
        dispatched
    }

    async fn route_text(
        &self,
        bot: &Bot,
        event: &Arc<InboundEvent>,
        text: &TextEvent,
        state: Option<&StateLabel>,
    ) -> Dispatched {
        for (index, compiled) in self.messages.iter().enumerate() {
            let spec = &compiled.spec;
            if !state_matches(spec.state.as_ref(), state)
                || spec.text.as_ref().is_some_and(|t| *t != text.text)
                || spec.filter.as_ref().is_some_and(|f| !f.check(event))
            {
                continue;
            }

            match invoke(&compiled.service, event, bot).await {
                Ok(Outcome::Handled) => {
                    return Dispatched::Handled {
                        kind: HandlerKind::Message,
                        index,
                    };
                }
                Ok(Outcome::Declined) => {
                    trace!(index, handler = spec.name.as_deref(), "Message handler declined");
                }
                Err(e) => log_failure(HandlerKind::Message, index, spec.name.as_deref(), &e),
            }
        }

        for (index, compiled) in self.defaults.iter().enumerate() {
            let spec = &compiled.spec;
            if !state_matches(spec.state.as_ref(), state) {
                continue;
            }
            match invoke(&compiled.service, event, bot).await {
                Ok(_) => {
                    return Dispatched::Handled {
                        kind: HandlerKind::Default,
                        index,
                    };
                }
                Err(e) => log_failure(HandlerKind::Default, index, spec.name.as_deref(), &e),
            }
        }

        bot.reply(&self.replies.unknown_text, None).await;
        Dispatched::UnknownText
    }

    async fn route_action(
        &self,
        bot: &Bot,
        event: &Arc<InboundEvent>,
        action: &ActionEvent,
        state: Option<&StateLabel>,
    ) -> Dispatched {
        if let Some(token) = action_token(&action.payload) {
            let found = self.buttons.iter().enumerate().find(|(_, c)| {
                c.spec.action == token && state_matches(c.spec.state.as_ref(), state)
            });
            if let Some((index, compiled)) = found {
                return match invoke(&compiled.service, event, bot).await {
                    Ok(_) => Dispatched::Handled {
                        kind: HandlerKind::Button,
                        index,
                    },
                    Err(e) => {
                        log_failure(HandlerKind::Button, index, compiled.spec.name.as_deref(), &e);
                        bot.reply(&self.replies.action_error, None).await;
                        Dispatched::ButtonFailed { index }
                    }
                };
            }
            trace!(action = %token, "No button handler for action");
        }

        for (index, compiled) in self.callbacks.iter().enumerate() {
            if !compiled.spec.filter.check(event) {
                continue;
            }
            match invoke(&compiled.service, event, bot).await {
                Ok(_) => {
                    return Dispatched::Handled {
                        kind: HandlerKind::Callback,
                        index,
                    };
                }
                Err(e) => {
                    log_failure(HandlerKind::Callback, index, compiled.spec.name.as_deref(), &e)
                }
            }
        }

        bot.reply(&self.replies.unknown_action, None).await;
        Dispatched::UnknownAction
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("messages", &self.messages.len())
            .field("buttons", &self.buttons.len())
            .field("callbacks", &self.callbacks.len())
            .field("defaults", &self.defaults.len())
            .field("replies", &self.replies)
            .finish()
    }
}

/// Runs one handler service with a fresh context, catching panics.
async fn invoke(service: &BoxedHandler, event: &Arc<InboundEvent>, bot: &Bot) -> HandlerResult {
    let ctx = HandlerContext::new(event.clone(), bot.clone());
    match AssertUnwindSafe(service.clone().oneshot(ctx))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(HandlerError::from_panic(panic)),
    }
}

fn log_failure(kind: HandlerKind, index: usize, name: Option<&str>, err: &HandlerError) {
    match err {
        HandlerError::Extract(e) => {
            warn!(%kind, index, handler = name, error = %e, "Handler parameters unavailable")
        }
        _ => error!(%kind, index, handler = name, error = %err, "Handler failed"),
    }
}

fn state_matches(required: Option<&StateLabel>, current: Option<&StateLabel>) -> bool {
    match required {
        None => true,
        Some(required) => current == Some(required),
    }
}

/// Reads the button command from the payload, without its leading slash.
fn action_token(payload: &Map<String, Value>) -> Option<String> {
    let raw = ["cmd", "action"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find(|v| is_truthy(v))?;
    Some(match raw {
        Value::String(s) => s.strip_prefix('/').unwrap_or(s).to_string(),
        other => other.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// =============================================================================
// DispatcherBuilder
// =============================================================================

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: Registry,
    middleware: MiddlewareChain,
    replies: FallbackReplies,
}

impl DispatcherBuilder {
    /// Adds a single handler spec.
    pub fn handler(mut self, spec: HandlerSpec) -> Self {
        self.registry.add(spec);
        self
    }

    /// Appends a router.
    pub fn router(mut self, router: Router) -> Self {
        self.registry.include(router);
        self
    }

    /// Appends a middleware; the first one added is outermost.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Replaces the middleware chain.
    pub fn middleware_chain(mut self, chain: MiddlewareChain) -> Self {
        self.middleware = chain;
        self
    }

    /// Overrides the fallback replies.
    pub fn replies(mut self, replies: FallbackReplies) -> Self {
        self.replies = replies;
        self
    }

    /// Wraps every handler in the middleware chain.
    pub fn build(self) -> Dispatcher {
        let chain = &self.middleware;
        macro_rules! compile {
            ($list:expr) => {
                $list
                    .into_iter()
                    .map(|spec| Compiled {
                        service: chain.wrap(spec.handler.clone()),
                        spec,
                    })
                    .collect()
            };
        }

        let Registry {
            messages,
            buttons,
            callbacks,
            defaults,
        } = self.registry;

        Dispatcher {
            messages: compile!(messages),
            buttons: compile!(buttons),
            callbacks: compile!(callbacks),
            defaults: compile!(defaults),
            replies: self.replies,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::context::DataBag;
    use crate::extractor::{Callback, FsmContext, Message};
    use crate::middleware::Next;
    use crate::predicate::{has_key, in_state, key_eq, text_eq};
    use crate::registry::{on_button, on_callback, on_default, on_message, on_text};
    use yabot_core::testing::RecordingTransport;
    use yabot_core::{Button, Keyboard};

    fn text(login: &str, t: &str) -> InboundEvent {
        InboundEvent::from_raw(&json!({"update_id": 1, "from": {"login": login}, "text": t}))
            .unwrap()
    }

    fn press(login: &str, payload: Value) -> InboundEvent {
        InboundEvent::from_raw(&json!({
            "update_id": 2,
            "from": {"login": login},
            "callback_data": payload,
        }))
        .unwrap()
    }

    fn setup() -> (Bot, RecordingTransport) {
        let transport = RecordingTransport::new();
        (Bot::new(transport.clone()), transport)
    }

    fn menu() -> Keyboard {
        Keyboard::new().row([Button::command("Name", "ask_name"), Button::command("Help", "help")])
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test]
    async fn test_first_eligible_wins() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_text("/start").handler(|| async { "first" }))
            .handler(on_text("/start").handler(|| async { "second" }))
            .build();

        let result = dispatcher.dispatch(&bot, text("alice", "/start")).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Message,
                index: 0
            }
        );
        assert_eq!(transport.sent_texts(), ["first"]);
    }

    #[tokio::test]
    async fn test_decline_falls_through() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().handler(|| async { false }))
            .handler(on_message().handler(|| async { "second" }))
            .build();

        let result = dispatcher.dispatch(&bot, text("alice", "hello")).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Message,
                index: 1
            }
        );
        assert_eq!(transport.sent_texts(), ["second"]);
    }

    #[tokio::test]
    async fn test_decline_everywhere_reaches_default_then_fallback() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().handler(|| async { false }))
            .build();

        let result = dispatcher.dispatch(&bot, text("carol", "xyz")).await;
        assert_eq!(result, Dispatched::UnknownText);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].login, "carol");
        assert_eq!(sent[0].text, FallbackReplies::default().unknown_text);
    }

    #[tokio::test]
    async fn test_default_handler_runs_after_message_handlers() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_text("/start").handler(|| async { "start" }))
            .handler(on_default().state("main").handler(|| async { "main default" }))
            .handler(on_default().handler(|| async { "any default" }))
            .build();

        dispatcher.dispatch(&bot, text("alice", "what")).await;
        bot.set_state("alice", Some("main"));
        dispatcher.dispatch(&bot, text("alice", "what")).await;

        assert_eq!(transport.sent_texts(), ["any default", "main default"]);
    }

    #[tokio::test]
    async fn test_error_in_message_handler_falls_through() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().handler(|| async { Err::<(), _>("broken") }))
            .handler(on_message().handler(|msg: Message| async move {
                if msg.text == "x" {
                    panic!("worse");
                }
            }))
            .handler(on_message().handler(|| async { "recovered" }))
            .build();

        let result = dispatcher.dispatch(&bot, text("alice", "x")).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Message,
                index: 2
            }
        );
        assert_eq!(transport.sent_texts(), ["recovered"]);
    }

    #[tokio::test]
    async fn test_state_gating() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().state("wait_name").handler(|msg: Message| async move {
                format!("name {}", msg.text)
            }))
            .handler(on_message().handler(|| async { "stateless" }))
            .build();

        dispatcher.dispatch(&bot, text("bob", "Bob")).await;
        bot.set_state("bob", Some("wait_name"));
        dispatcher.dispatch(&bot, text("bob", "Bob")).await;

        assert_eq!(transport.sent_texts(), ["stateless", "name Bob"]);
    }

    #[tokio::test]
    async fn test_filter_is_checked() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().filter(text_eq("secret")).handler(|| async { "filtered" }))
            .handler(on_message().handler(|| async { "open" }))
            .build();

        dispatcher.dispatch(&bot, text("alice", "secret")).await;
        dispatcher.dispatch(&bot, text("alice", "public")).await;

        assert_eq!(transport.sent_texts(), ["filtered", "open"]);
    }

    #[tokio::test]
    async fn test_button_match_strips_slash() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_button("help").handler(|| async { "help text" }))
            .build();

        let result = dispatcher.dispatch(&bot, press("bob", json!({"cmd": "/help"}))).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Button,
                index: 0
            }
        );
        dispatcher.dispatch(&bot, press("bob", json!({"action": "help"}))).await;
        assert_eq!(transport.sent_texts(), ["help text", "help text"]);
    }

    #[tokio::test]
    async fn test_button_strips_only_one_slash() {
        let (bot, _transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_button("help").handler(|| async { "help text" }))
            .handler(on_button("//menu").handler(|| async { "menu" }))
            .build();

        let result = dispatcher.dispatch(&bot, press("bob", json!({"cmd": "//help"}))).await;
        assert!(!matches!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Button,
                ..
            }
        ));

        let result = dispatcher.dispatch(&bot, press("bob", json!({"cmd": "//menu"}))).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Button,
                index: 1
            }
        );
    }

    #[tokio::test]
    async fn test_button_error_replies_without_fallthrough() {
        let (bot, transport) = setup();
        let callbacks = counter();
        let seen = callbacks.clone();
        let dispatcher = Dispatcher::builder()
            .handler(on_button("pay").handler(|| async { Err::<(), _>("gateway down") }))
            .handler(on_callback().handler(move || {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            }))
            .build();

        let result = dispatcher.dispatch(&bot, press("bob", json!({"cmd": "/pay"}))).await;
        assert_eq!(result, Dispatched::ButtonFailed { index: 0 });
        assert_eq!(transport.sent_texts(), [FallbackReplies::default().action_error]);
        assert_eq!(callbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_button_state_mismatch_uses_callbacks() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_button("confirm").state("checkout").handler(|| async { "confirmed" }))
            .handler(
                on_callback()
                    .filter(has_key("cmd"))
                    .handler(|cb: Callback| async move { format!("late {}", cb.payload["cmd"]) }),
            )
            .build();

        dispatcher.dispatch(&bot, press("bob", json!({"cmd": "/confirm"}))).await;
        assert_eq!(transport.sent_texts(), ["late \"/confirm\""]);
    }

    #[tokio::test]
    async fn test_callback_filters_and_fallback() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(
                on_callback()
                    .filter(key_eq("hash", "abc"))
                    .handler(|| async { "abc picked" }),
            )
            .build();

        dispatcher.dispatch(&bot, press("bob", json!({"hash": "abc"}))).await;
        let result = dispatcher.dispatch(&bot, press("bob", json!({"hash": "zzz"}))).await;

        assert_eq!(result, Dispatched::UnknownAction);
        assert_eq!(
            transport.sent_texts(),
            ["abc picked".to_string(), FallbackReplies::default().unknown_action]
        );
    }

    #[tokio::test]
    async fn test_failing_callback_tries_next() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_callback().handler(|| async { Err::<(), _>("nope") }))
            .handler(on_callback().handler(|| async { "second" }))
            .build();

        let result = dispatcher.dispatch(&bot, press("bob", json!({"x": 1}))).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Callback,
                index: 1
            }
        );
        assert_eq!(transport.sent_texts(), ["second"]);
    }

    #[tokio::test]
    async fn test_in_state_filter_inside_dispatch() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().filter(in_state(["main"])).handler(|| async { "in main" }))
            .handler(on_default().handler(|| async { "elsewhere" }))
            .build();

        dispatcher.dispatch(&bot, text("alice", "x")).await;
        bot.set_state("alice", Some("main"));
        dispatcher.dispatch(&bot, text("alice", "x")).await;

        assert_eq!(transport.sent_texts(), ["elsewhere", "in main"]);
    }

    #[tokio::test]
    async fn test_middleware_wraps_every_handler() {
        let (bot, transport) = setup();
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let mw_log = log.clone();
        let dispatcher = Dispatcher::builder()
            .middleware(move |ctx: HandlerContext, next: Next| {
                let log = mw_log.clone();
                async move {
                    log.lock().push(format!("mw:{}", ctx.event().kind()));
                    ctx.data().insert("greeting", "hey");
                    next.run(ctx).await
                }
            })
            .handler(on_message().handler(|data: DataBag| async move {
                data.get("greeting")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            }))
            .handler(on_button("help").handler(|| async {}))
            .build();

        dispatcher.dispatch(&bot, text("alice", "x")).await;
        dispatcher.dispatch(&bot, press("alice", json!({"cmd": "help"}))).await;

        assert_eq!(*log.lock(), ["mw:text", "mw:action"]);
        assert_eq!(transport.sent_texts(), ["hey"]);
    }

    #[tokio::test]
    async fn test_data_bag_is_fresh_per_invocation() {
        let (bot, _transport) = setup();
        let dispatcher = Dispatcher::builder()
            .handler(on_message().handler(|data: DataBag| async move {
                let fresh = !data.contains("touched");
                data.insert("touched", true);
                assert!(fresh);
                false
            }))
            .handler(on_message().handler(|data: DataBag| async move {
                assert!(!data.contains("touched"));
            }))
            .build();

        let result = dispatcher.dispatch(&bot, text("alice", "x")).await;
        assert_eq!(
            result,
            Dispatched::Handled {
                kind: HandlerKind::Message,
                index: 1
            }
        );
    }

    #[tokio::test]
    async fn test_menu_scenarios() {
        let (bot, transport) = setup();
        let menu_router = Router::new()
            .with(on_text("/start").handler(|fsm: FsmContext, bot: Bot| async move {
                fsm.set(Some("main"));
                bot.reply("Hello! Choose an option:", Some(menu())).await;
            }))
            .with(on_text("/menu").handler(|bot: Bot| async move {
                bot.reply("Choose an option:", Some(menu())).await;
            }));
        let name_router = Router::new()
            .with(on_button("ask_name").handler(|fsm: FsmContext, bot: Bot| async move {
                fsm.set(Some("wait_name"));
                bot.reply("Enter your name:", None).await;
            }))
            .with(on_message().state("wait_name").handler(
                |msg: Message, fsm: FsmContext, bot: Bot| async move {
                    fsm.set(Some("main"));
                    bot.reply(&format!("Nice to meet you, {}!", msg.text), Some(menu()))
                        .await;
                },
            ));
        let dispatcher = Dispatcher::builder()
            .router(menu_router)
            .router(name_router)
            .build();

        dispatcher.dispatch(&bot, text("alice", "/start")).await;
        assert_eq!(bot.state("alice"), Some(StateLabel::new("main")));

        dispatcher.dispatch(&bot, text("alice", "/menu")).await;
        assert_eq!(bot.state("alice"), Some(StateLabel::new("main")));

        dispatcher.dispatch(&bot, press("bob", json!({"cmd": "/ask_name"}))).await;
        assert_eq!(bot.state("bob"), Some(StateLabel::new("wait_name")));

        dispatcher.dispatch(&bot, text("bob", "  Bob  ")).await;
        assert_eq!(bot.state("bob"), Some(StateLabel::new("main")));

        dispatcher.dispatch(&bot, text("carol", "xyz")).await;

        let sent = transport.sent();
        let summary: Vec<_> = sent
            .iter()
            .map(|m| (m.login.as_str(), m.text.as_str(), m.inline_keyboard.is_some()))
            .collect();
        assert_eq!(
            summary,
            [
                ("alice", "Hello! Choose an option:", true),
                ("alice", "Choose an option:", true),
                ("bob", "Enter your name:", false),
                ("bob", "Nice to meet you, Bob!", true),
                ("carol", "I don't understand, try the main menu.", false),
            ]
        );
        assert_eq!(sent[0].inline_keyboard.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_custom_replies() {
        let (bot, transport) = setup();
        let dispatcher = Dispatcher::builder()
            .replies(FallbackReplies {
                unknown_text: "??".into(),
                ..Default::default()
            })
            .build();

        dispatcher.dispatch(&bot, text("alice", "x")).await;
        assert_eq!(transport.sent_texts(), ["??"]);
    }
}
