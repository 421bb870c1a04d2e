//! Extractor system for the yabot framework.
//!
//! The [`FromContext`] trait defines how handler parameters are pulled out of
//! a [`HandlerContext`]. A handler may take any number of extractors:
//!
//! ```rust,ignore
//! async fn got_name(msg: Message, fsm: FsmContext, bot: Bot) {
//!     fsm.set(Some(AppState::Main));
//!     bot.reply(&format!("Nice to meet you, {}!", msg.text), None).await;
//! }
//! ```
//!
//! When an extractor fails the handler is not called and the invocation
//! counts as a failure.

use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{DataBag, HandlerContext};
use crate::error::{ExtractError, ExtractResult};
use yabot_core::{ActionEvent, Bot, InboundEvent, StateLabel, TextEvent, User, UserData};

/// A trait for types that can be extracted from a [`HandlerContext`].
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self>;
}

impl FromContext for HandlerContext {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.clone())
    }
}

impl FromContext for Bot {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.bot().clone())
    }
}

impl FromContext for DataBag {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.data().clone())
    }
}

impl FromContext for Arc<InboundEvent> {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.event().clone())
    }
}

/// The sender's [`UserData`].
impl FromContext for UserData {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.bot().user_data(ctx.login()))
    }
}

/// Allows optional parameters: extraction never fails.
impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

// =============================================================================
// Event extractors
// =============================================================================

/// A text message. Fails on button presses.
#[derive(Debug, Clone)]
pub struct Message(pub TextEvent);

impl Deref for Message {
    type Target = TextEvent;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Message {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        match ctx.event().as_ref() {
            InboundEvent::Text(e) => Ok(Self(e.clone())),
            other => Err(ExtractError::EventKindMismatch {
                expected: "text",
                got: other.kind(),
            }),
        }
    }
}

/// A button press. Fails on text messages.
#[derive(Debug, Clone)]
pub struct Callback(pub ActionEvent);

impl Deref for Callback {
    type Target = ActionEvent;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Callback {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        match ctx.event().as_ref() {
            InboundEvent::Action(e) => Ok(Self(e.clone())),
            other => Err(ExtractError::EventKindMismatch {
                expected: "action",
                got: other.kind(),
            }),
        }
    }
}

/// The author of the event.
#[derive(Debug, Clone)]
pub struct Sender(pub User);

impl Deref for Sender {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Sender {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(Self(ctx.event().sender().clone()))
    }
}

/// A button payload deserialized into `T`.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Pick { hash: String }
///
/// async fn on_pick(Payload(pick): Payload<Pick>) -> String {
///     format!("picked {}", pick.hash)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<T: DeserializeOwned> FromContext for Payload<T> {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        let payload = ctx
            .event()
            .payload()
            .ok_or(ExtractError::EventKindMismatch {
                expected: "action",
                got: "text",
            })?;
        serde_json::from_value(Value::Object(payload.clone()))
            .map(Self)
            .map_err(|e| ExtractError::InvalidPayload(e.to_string()))
    }
}

// =============================================================================
// FsmContext
// =============================================================================

/// FSM access for the sender being handled.
#[derive(Debug, Clone)]
pub struct FsmContext {
    bot: Bot,
    login: String,
}

impl FsmContext {
    /// Creates a context for `login`.
    pub fn new(bot: Bot, login: impl Into<String>) -> Self {
        Self {
            bot,
            login: login.into(),
        }
    }

    /// The sender's current label.
    pub fn get(&self) -> Option<StateLabel> {
        self.bot.fsm().get(&self.login)
    }

    /// Sets or clears the sender's label.
    pub fn set<S: Into<StateLabel>>(&self, state: Option<S>) {
        self.bot.fsm().set(&self.login, state);
    }

    /// Clears the sender's label.
    pub fn clear(&self) {
        self.bot.fsm().clear(&self.login);
    }

    /// The login this context is bound to.
    pub fn login(&self) -> &str {
        &self.login
    }
}

impl FromContext for FsmContext {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(Self::new(ctx.bot().clone(), ctx.login()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use yabot_core::testing::RecordingTransport;

    fn ctx_for(raw: Value) -> HandlerContext {
        let event = InboundEvent::from_raw(&raw).unwrap();
        HandlerContext::new(Arc::new(event), Bot::new(RecordingTransport::new()))
    }

    #[test]
    fn test_message_extractor() {
        let ctx = ctx_for(json!({"update_id": 1, "from": {"login": "alice"}, "text": " hi "}));
        let msg = Message::from_context(&ctx).unwrap();
        assert_eq!(msg.text, "hi");
        assert!(Callback::from_context(&ctx).is_err());
        assert!(Option::<Callback>::from_context(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_payload_extractor() {
        #[derive(Deserialize)]
        struct Pick {
            hash: String,
        }

        let ctx = ctx_for(json!({
            "update_id": 2,
            "from": {"login": "bob"},
            "callback_data": {"hash": "abc"},
        }));
        let Payload(pick) = Payload::<Pick>::from_context(&ctx).unwrap();
        assert_eq!(pick.hash, "abc");
        assert_eq!(Callback::from_context(&ctx).unwrap().get("hash"), Some(&json!("abc")));
    }

    #[test]
    fn test_fsm_context_targets_sender() {
        let ctx = ctx_for(json!({"update_id": 3, "from": {"login": "carol"}, "text": "x"}));
        let fsm = FsmContext::from_context(&ctx).unwrap();
        fsm.set(Some("main"));
        assert_eq!(ctx.bot().state("carol"), Some(StateLabel::new("main")));
        fsm.clear();
        assert_eq!(fsm.get(), None);
    }
}
