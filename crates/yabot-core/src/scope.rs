//! Task-local "who is being handled right now".
//!
//! The dispatcher wraps the handling of every event in [`with_scope`], so code
//! running inside it (handlers, middleware, predicates, [`Bot::reply`]) can
//! find the bot and the sender without them being passed around.
//!
//! A binding is visible only inside the future it wraps. Tasks spawned from a
//! handler do not inherit it, and the binding is gone once the future
//! completes, panics or is dropped.

use std::future::Future;

use crate::bot::Bot;

tokio::task_local! {
    static SCOPE: Scope;
}

/// The identity bound for one unit of work.
#[derive(Clone, Debug)]
pub struct Scope {
    /// The bot handling the event.
    pub bot: Bot,
    /// Login of the sender of the event.
    pub sender: String,
}

/// Runs `fut` with `(bot, sender)` bound as the current scope.
pub async fn with_scope<F>(bot: Bot, sender: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    let scope = Scope {
        bot,
        sender: sender.into(),
    };
    SCOPE.scope(scope, fut).await
}

/// Returns the current scope, if any.
pub fn current() -> Option<Scope> {
    SCOPE.try_with(Clone::clone).ok()
}

/// Returns the bot of the current scope.
pub fn current_bot() -> Option<Bot> {
    SCOPE.try_with(|s| s.bot.clone()).ok()
}

/// Returns the sender login of the current scope.
pub fn current_sender() -> Option<String> {
    SCOPE.try_with(|s| s.sender.clone()).ok()
}
