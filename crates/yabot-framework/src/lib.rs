//! # yabot framework
//!
//! Handler registration and dispatch on top of `yabot-core`:
//!
//! - **Handlers** ([`handler`], [`extractor`]): async functions whose
//!   parameters are extracted from the [`HandlerContext`]
//! - **Registry** ([`registry`]): ordered message, button, callback and
//!   default handler lists, plus [`Router`] merging
//! - **Predicates** ([`predicate`]): composable filters
//! - **Middleware** ([`middleware`]): an onion chain around every handler
//! - **Dispatcher** ([`dispatcher`]): the matching engine with fallback replies
//!
//! ```text
//! InboundEvent ─▶ Dispatcher ─▶ first eligible spec ─▶ middleware chain ─▶ handler
//!                     │                                                       │
//!                     │◀──────────── Handled / Declined / Err ◀───────────────┘
//!                     ▼
//!              next spec or fallback reply
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod middleware;
pub mod predicate;
pub mod registry;

pub use context::{DataBag, HandlerContext};
pub use dispatcher::{Dispatched, Dispatcher, DispatcherBuilder, FallbackReplies, HandlerKind};
pub use error::{ExtractError, ExtractResult, HandlerError, HandlerResult, Outcome};
pub use extractor::{Callback, FromContext, FsmContext, Message, Payload, Sender};
pub use handler::{BoxedHandler, Handler, HandlerResponse, Reply, into_boxed};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use predicate::{
    Predicate, all, always, and, any, has_key, in_state, key_eq, not, or, text_eq,
};
pub use registry::{
    HandlerSpec, Registry, Router, on_button, on_callback, on_default, on_message, on_text,
};
