//! # yabot
//!
//! A long-polling client for the Yandex Messenger Bot API with ordered
//! handler dispatch, per-user state and middleware.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────┐   ┌───────────┐   ┌────────────┐   ┌────────────────────┐
//! │ Bot API   │──▶│ Poller │──▶│ Scheduler │──▶│ Dispatcher │──▶│ middleware ─▶ handler │
//! └───────────┘   └────────┘   └───────────┘   └────────────┘   └────────────────────┘
//!       ▲                       (N tasks)        (scope: bot, sender)        │
//!       └──────────────────────────── sendText ◀──────────── reply ◀─────────┘
//! ```
//!
//! - **Handlers** are async functions taking extractors ([`Message`](prelude::Message),
//!   [`Callback`](prelude::Callback), [`FsmContext`](prelude::FsmContext), [`Bot`](prelude::Bot), ...)
//! - **Registration order is priority**: the first eligible handler that does
//!   not decline wins
//! - **Routers** group handlers and are appended with `.router(..)`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use yabot::prelude::*;
//!
//! fn menu() -> Keyboard {
//!     Keyboard::new().row([Button::command("Help", "help")])
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Router::new()
//!         .with(on_text("/start").handler(|| async { Reply::text("Hello!").keyboard(menu()) }))
//!         .with(on_button("help").handler(|| async { "Use the buttons below." }));
//!
//!     // Token from YANDEX_BOT_API_KEY or yabot.toml
//!     BotRuntime::builder().router(router).build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use yabot_core as core;
pub use yabot_framework as framework;
pub use yabot_runtime as runtime;
pub use yabot_transport as transport;

/// Commonly used types for building bots.
///
/// ```rust,ignore
/// use yabot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use yabot_runtime::{BotConfig, BotRuntime, StopHandle};

    // Registration
    pub use yabot_framework::{
        HandlerSpec, Registry, Router, on_button, on_callback, on_default, on_message, on_text,
    };

    // Extractors and responses
    pub use yabot_framework::{
        Callback, DataBag, FsmContext, HandlerContext, Message, Outcome, Payload, Reply, Sender,
    };

    // Filters
    pub use yabot_framework::predicate::{
        self, Predicate, all, always, any, has_key, in_state, key_eq, not, text_eq,
    };

    // Middleware
    pub use yabot_framework::{FallbackReplies, HandlerResult, Middleware, Next};

    // Bot handle, keyboards and state
    pub use yabot_core::{
        Bot, Button, InboundEvent, Keyboard, StateLabel, current_bot, current_sender,
    };
}
