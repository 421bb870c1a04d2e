//! # yabot transport
//!
//! The HTTP implementation of [`yabot_core::Transport`] for the Yandex
//! Messenger Bot API.
//!
//! | Call       | Request                                           | Response                 |
//! |------------|---------------------------------------------------|--------------------------|
//! | fetch      | `GET  /messages/getUpdates?offset=<o>&limit=<k>`  | `{ "updates": [...] }`   |
//! | send       | `POST /messages/sendText` with a JSON body        | `{ "message_id": n }`    |
//!
//! Every call carries `Authorization: OAuth <token>`.
//!
//! ```rust,ignore
//! let transport = HttpTransport::new(HttpTransportConfig::new(token))?;
//! let bot = Bot::new(transport);
//! ```

pub mod http;

pub use http::{DEFAULT_BASE_URL, HttpTransport, HttpTransportConfig};
