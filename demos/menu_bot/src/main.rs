//! Menu Bot Example
//!
//! A two-router bot showing buttons, per-user state and middleware.
//!
//! ```text
//! /start ──▶ "Hello! Choose an option:" [Name] [Help]
//!              │
//!              └─ Name ──▶ "Enter your name:"   (state: wait_name)
//!                             └─ <text> ──▶ "Nice to meet you, <text>!"   (state: main)
//! ```
//!
//! # Usage
//!
//! ```bash
//! YANDEX_BOT_API_KEY=... cargo run --package menu-bot
//! ```

use std::time::Instant;

use anyhow::Result;
use tracing::info;
use yabot::prelude::*;

// ============================================================================
// State and keyboards
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum AppState {
    Main,
    WaitName,
}

impl From<AppState> for StateLabel {
    fn from(state: AppState) -> Self {
        match state {
            AppState::Main => StateLabel::new("main"),
            AppState::WaitName => StateLabel::new("wait_name"),
        }
    }
}

fn menu_keyboard() -> Keyboard {
    Keyboard::new().row([
        Button::command("Name", "/ask_name"),
        Button::command("Help", "/help"),
    ])
}

// ============================================================================
// Handlers
// ============================================================================

async fn start(fsm: FsmContext) -> Reply {
    fsm.set(Some(AppState::Main));
    Reply::text("Hello! Choose an option:").keyboard(menu_keyboard())
}

async fn help() -> Reply {
    Reply::text("Press Name to introduce yourself, or send /menu to see the buttons again.")
        .keyboard(menu_keyboard())
}

async fn ask_name(fsm: FsmContext) -> &'static str {
    fsm.set(Some(AppState::WaitName));
    "Enter your name:"
}

async fn got_name(msg: Message, fsm: FsmContext) -> Reply {
    fsm.set(Some(AppState::Main));
    let name = if msg.text.is_empty() { "guest" } else { msg.text.as_str() };
    Reply::text(format!("Nice to meet you, {name}!")).keyboard(menu_keyboard())
}

fn menu_router() -> Router {
    Router::new()
        .with(on_text("/start").name("start").handler(start))
        .with(on_text("/menu").name("menu").handler(start))
        .with(on_button("help").name("help").handler(help))
}

fn name_router() -> Router {
    Router::new()
        .with(on_button("ask_name").name("ask_name").handler(ask_name))
        .with(
            on_message()
                .state(AppState::WaitName)
                .name("got_name")
                .handler(got_name),
        )
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = BotRuntime::builder()
        .middleware(|ctx: HandlerContext, next: Next| async move {
            let login = ctx.login().to_string();
            let started = Instant::now();
            let result = next.run(ctx).await;
            info!(%login, elapsed_ms = started.elapsed().as_millis() as u64, "Handler finished");
            result
        })
        .router(menu_router())
        .router(name_router())
        .build()?;

    runtime.run().await?;
    Ok(())
}
