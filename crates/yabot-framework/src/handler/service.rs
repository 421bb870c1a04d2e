//! Core handler service for the yabot framework.
//!
//! [`HandlerService<H, T>`] wraps a single handler and implements
//! `tower::Service<HandlerContext>`. Middleware is stacked on top of it as
//! ordinary tower layers, and the result is stored type-erased as a
//! [`BoxedHandler`].

use std::marker::PhantomData;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tower::Service;
use tower::util::BoxCloneSyncService;

use super::traits::Handler;
use crate::context::HandlerContext;
use crate::error::{HandlerError, HandlerResult, Outcome};
use yabot_core::Keyboard;

/// A type-erased, cloneable handler service.
pub type BoxedHandler = BoxCloneSyncService<HandlerContext, Outcome, HandlerError>;

// ============================================================================
// HandlerResponse
// ============================================================================

/// A trait for types that can be returned from handlers.
#[async_trait]
pub trait HandlerResponse: Send + 'static {
    /// Performs any side effect (such as replying) and reports the outcome.
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult;
}

/// `()` - handled, nothing to send.
#[async_trait]
impl HandlerResponse for () {
    async fn into_outcome(self, _ctx: &HandlerContext) -> HandlerResult {
        Ok(Outcome::Handled)
    }
}

/// `false` declines, `true` handles.
#[async_trait]
impl HandlerResponse for bool {
    async fn into_outcome(self, _ctx: &HandlerContext) -> HandlerResult {
        Ok(if self {
            Outcome::Handled
        } else {
            Outcome::Declined
        })
    }
}

#[async_trait]
impl HandlerResponse for Outcome {
    async fn into_outcome(self, _ctx: &HandlerContext) -> HandlerResult {
        Ok(self)
    }
}

/// `String` - replies with the text.
#[async_trait]
impl HandlerResponse for String {
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult {
        Reply::text(self).into_outcome(ctx).await
    }
}

#[async_trait]
impl HandlerResponse for &'static str {
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult {
        Reply::text(self).into_outcome(ctx).await
    }
}

/// `Option<T>` - `None` counts as handled.
#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult {
        match self {
            Some(t) => t.into_outcome(ctx).await,
            None => Ok(Outcome::Handled),
        }
    }
}

/// `Result<T, E>` - `Err` is reported as a handler failure.
#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: Into<tower::BoxError> + Send + 'static,
{
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult {
        match self {
            Ok(t) => t.into_outcome(ctx).await,
            Err(e) => Err(HandlerError::failed(e)),
        }
    }
}

/// A reply with an optional keyboard, sent to the event sender.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Message text.
    pub text: String,
    /// Inline keyboard.
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Attaches a keyboard.
    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[async_trait]
impl HandlerResponse for Reply {
    async fn into_outcome(self, ctx: &HandlerContext) -> HandlerResult {
        ctx.bot()
            .send_message(ctx.login(), &self.text, self.keyboard)
            .await;
        Ok(Outcome::Handled)
    }
}

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls a single generic handler.
pub struct HandlerService<H, T> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> HandlerService<H, T> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H: Clone, T> Clone for HandlerService<H, T> {
    fn clone(&self) -> Self {
        HandlerService {
            handler: self.handler.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H, T> Service<HandlerContext> for HandlerService<H, T>
where
    H: Handler<T>,
{
    type Response = Outcome;
    type Error = HandlerError;
    type Future = BoxFuture<'static, HandlerResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: HandlerContext) -> Self::Future {
        self.handler.clone().call(ctx)
    }
}

/// Boxes a handler function into a [`BoxedHandler`].
pub fn into_boxed<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}
