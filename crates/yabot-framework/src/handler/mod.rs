//! Handler system for the yabot framework.
//!
//! - **Handler** ([`traits`]) – the [`Handler`] trait adapting async functions
//!   with extractor parameters, similar to Axum's system
//! - **Service** ([`service`]) – [`HandlerService`], return-value handling
//!   ([`HandlerResponse`]) and the type-erased [`BoxedHandler`]
//!
//! ```text
//! on_text("/start")           ← spec builder with match conditions
//!     .handler(start)         ← HandlerService boxed into a BoxedHandler
//! ```

pub mod service;
pub mod traits;

pub use service::{BoxedHandler, HandlerResponse, HandlerService, Reply, into_boxed};
pub use traits::Handler;

pub use tower::Layer;
