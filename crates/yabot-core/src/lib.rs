//! # yabot core
//!
//! Core types shared by every yabot crate:
//!
//! - **Events**: raw update parsing into [`InboundEvent`] ([`event`])
//! - **Transport boundary**: the [`Transport`] trait and the `sendText` body ([`transport`])
//! - **Keyboards**: inline button rows and their flattening ([`keyboard`])
//! - **Per-user state**: FSM labels and free-form user data ([`state`])
//! - **Bot handle**: sending and replying ([`bot`])
//! - **Context scope**: the task-local `(bot, sender)` binding ([`scope`])
//!
//! ```text
//! ┌───────────┐  raw JSON   ┌──────────────┐   InboundEvent   ┌────────────┐
//! │ Transport │────────────▶│ from_raw     │─────────────────▶│ dispatcher │
//! └───────────┘             └──────────────┘                  └─────┬──────┘
//!       ▲                                                           │ with_scope(bot, sender)
//!       │ send_text                                                 ▼
//!       └──────────────────────────── Bot::reply ◀─────────────── handler
//! ```

pub mod bot;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod scope;
pub mod state;
pub mod testing;
pub mod transport;

pub use bot::Bot;
pub use error::{ParseError, ParseResult, TransportError, TransportResult};
pub use event::{ActionEvent, InboundEvent, TextEvent, User};
pub use keyboard::{Button, Keyboard};
pub use scope::{Scope, current_bot, current_sender, with_scope};
pub use state::{FsmStore, StateLabel, UserData, UserDataStore};
pub use transport::{BoxedTransport, OutgoingText, Transport};
