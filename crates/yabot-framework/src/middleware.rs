//! Middleware chain.
//!
//! A middleware wraps every handler invocation. It receives the context and a
//! [`Next`] continuation, and may
//!
//! - run code before and after the rest of the chain,
//! - write into the context's [`DataBag`](crate::context::DataBag) for inner
//!   layers and the handler to read,
//! - skip [`Next::run`] entirely to short-circuit the handler.
//!
//! The first registered middleware is the outermost one:
//!
//! ```text
//! chain [m1, m2]:   m1 ─▶ m2 ─▶ handler ─▶ m2 ─▶ m1
//! ```
//!
//! Each middleware is applied as a tower [`Layer`] ([`MiddlewareLayer`]) over
//! the boxed handler service.
//!
//! ```rust,ignore
//! let chain = MiddlewareChain::new().with(|ctx: HandlerContext, next: Next| async move {
//!     ctx.data().insert("started", true);
//!     next.run(ctx).await
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

use crate::context::HandlerContext;
use crate::error::{HandlerError, HandlerResult, Outcome};
use crate::handler::BoxedHandler;

/// A wrapper around handler invocations.
pub trait Middleware: Send + Sync + 'static {
    /// Handles one invocation. Call `next.run(ctx)` to continue the chain.
    fn handle(&self, ctx: HandlerContext, next: Next) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(HandlerContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, ctx: HandlerContext, next: Next) -> BoxFuture<'static, HandlerResult> {
        (self)(ctx, next).boxed()
    }
}

/// The remainder of the chain.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the remaining middleware and the handler.
    pub async fn run(self, ctx: HandlerContext) -> HandlerResult {
        self.inner.oneshot(ctx).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

// ============================================================================
// Layer / Service
// ============================================================================

/// Applies one [`Middleware`] as a tower layer.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: Arc<dyn Middleware>,
}

impl MiddlewareLayer {
    pub fn new<M: Middleware>(middleware: M) -> Self {
        Self {
            middleware: Arc::new(middleware),
        }
    }
}

impl Layer<BoxedHandler> for MiddlewareLayer {
    type Service = MiddlewareService;

    fn layer(&self, inner: BoxedHandler) -> Self::Service {
        MiddlewareService {
            middleware: self.middleware.clone(),
            inner,
        }
    }
}

/// A handler service wrapped by one middleware.
#[derive(Clone)]
pub struct MiddlewareService {
    middleware: Arc<dyn Middleware>,
    inner: BoxedHandler,
}

impl Service<HandlerContext> for MiddlewareService {
    type Response = Outcome;
    type Error = HandlerError;
    type Future = BoxFuture<'static, HandlerResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: HandlerContext) -> Self::Future {
        let next = Next {
            inner: self.inner.clone(),
        };
        self.middleware.handle(ctx, next)
    }
}

// ============================================================================
// MiddlewareChain
// ============================================================================

/// Ordered middleware list. The first entry is outermost.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<MiddlewareLayer>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware (innermost so far).
    pub fn push<M: Middleware>(&mut self, middleware: M) {
        self.layers.push(MiddlewareLayer::new(middleware));
    }

    /// Appends a middleware (builder pattern).
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.push(middleware);
        self
    }

    /// Number of middleware.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` when the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `handler` so that the first middleware runs first.
    ///
    /// An empty chain returns the handler unchanged.
    pub fn wrap(&self, handler: BoxedHandler) -> BoxedHandler {
        self.layers.iter().rev().fold(handler, |svc, layer| {
            BoxCloneSyncService::new(layer.layer(svc))
        })
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.layers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::context::DataBag;
    use crate::handler::into_boxed;
    use yabot_core::testing::RecordingTransport;
    use yabot_core::{Bot, InboundEvent};

    fn ctx() -> HandlerContext {
        let event = InboundEvent::from_raw(&json!({
            "update_id": 1,
            "from": {"login": "alice"},
            "text": "hi",
        }))
        .unwrap();
        HandlerContext::new(Arc::new(event), Bot::new(RecordingTransport::new()))
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> impl Middleware {
        let log = log.clone();
        move |ctx: HandlerContext, next: Next| {
            let log = log.clone();
            async move {
                log.lock().push(format!("{name}:before"));
                let res = next.run(ctx).await;
                log.lock().push(format!("{name}:after"));
                res
            }
        }
    }

    #[tokio::test]
    async fn test_first_registered_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let handler = into_boxed(move || {
            let log = handler_log.clone();
            async move { log.lock().push("handler".to_string()) }
        });

        let chain = MiddlewareChain::new()
            .with(recorder(&log, "m1"))
            .with(recorder(&log, "m2"));
        let outcome = chain.wrap(handler).oneshot(ctx()).await.unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            *log.lock(),
            ["m1:before", "m2:before", "handler", "m2:after", "m1:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let handler = into_boxed(move || {
            let flag = flag.clone();
            async move { *flag.lock() = true }
        });

        let chain = MiddlewareChain::new()
            .with(|_ctx: HandlerContext, _next: Next| async {
                Ok::<_, HandlerError>(Outcome::Handled)
            });
        chain.wrap(handler).oneshot(ctx()).await.unwrap();

        assert!(!*called.lock());
    }

    #[tokio::test]
    async fn test_data_bag_flows_inward() {
        let handler = into_boxed(|data: DataBag| async move {
            data.get("user_role") == Some(json!("admin"))
        });

        let chain = MiddlewareChain::new().with(|ctx: HandlerContext, next: Next| async move {
            ctx.data().insert("user_role", "admin");
            next.run(ctx).await
        });

        assert_eq!(
            chain.wrap(handler).oneshot(ctx()).await.unwrap(),
            Outcome::Handled
        );
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler_directly() {
        let handler = into_boxed(|| async { false });
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        assert_eq!(
            chain.wrap(handler).oneshot(ctx()).await.unwrap(),
            Outcome::Declined
        );
    }
}
