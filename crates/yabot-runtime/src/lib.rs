//! yabot runtime - long polling, scheduling and configuration.
//!
//! This crate provides:
//! - Configuration loading and validation ([`config`])
//! - Logging setup ([`logging`])
//! - The update cursor ([`Poller`])
//! - Bounded-concurrency dispatch with graceful shutdown ([`Scheduler`])
//! - The orchestrating [`BotRuntime`]
//!
//! ```ignore
//! use yabot_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BotRuntime::builder()
//!         .router(menu_router())
//!         .build()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod runtime;
pub mod scheduler;

// Re-exports
pub use config::{BotConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use poller::Poller;
pub use runtime::{BotRuntime, RuntimeBuilder, StopHandle};
pub use scheduler::{Scheduler, SchedulerError, SenderGuard, SenderLocks, ShutdownReport};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
