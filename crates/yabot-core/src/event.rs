//! Inbound event model.
//!
//! Every raw update returned by `getUpdates` is turned into exactly one
//! [`InboundEvent`] or rejected with a [`ParseError`]. Updates carrying a
//! callback payload become [`ActionEvent`]s (button presses), everything else
//! becomes a [`TextEvent`].
//!
//! ```text
//! raw update ──▶ InboundEvent::from_raw ──┬──▶ Text(TextEvent)      (no payload)
//!                                         ├──▶ Action(ActionEvent)  (payload object)
//!                                         └──▶ Err(ParseError)      (dropped)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};

/// Payload keys, in lookup order.
const PAYLOAD_KEYS: [&str; 3] = ["callbackData", "callback_data", "payload"];

/// The author of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Messenger login, used as the sender identity everywhere.
    pub login: String,
    /// Opaque user id, when the server sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the author is a bot.
    #[serde(default)]
    pub robot: bool,
}

impl User {
    fn from_raw(raw: &Value) -> ParseResult<Self> {
        let from = raw.get("from").and_then(Value::as_object);
        let login = from
            .and_then(|f| f.get("login"))
            .and_then(Value::as_str)
            .filter(|login| !login.is_empty())
            .ok_or(ParseError::MissingSender)?;
        let field = |key: &str| {
            from.and_then(|f| f.get(key)).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };

        Ok(Self {
            login: login.to_string(),
            id: field("id"),
            display_name: field("display_name"),
            robot: from
                .and_then(|f| f.get("robot"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

/// A plain text message.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEvent {
    /// Who wrote the message.
    pub sender: User,
    /// Message text with surrounding whitespace removed.
    pub text: String,
    /// Server-side message id.
    pub message_id: Option<i64>,
    /// Monotonic update id assigned by the server.
    pub update_id: i64,
    /// Unix timestamp of the message, if present.
    pub timestamp: Option<i64>,
    /// The untouched update.
    pub raw: Value,
}

/// An inline button press.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    /// Who pressed the button.
    pub sender: User,
    /// The id of the message the button belongs to.
    pub message_id: Option<i64>,
    /// Monotonic update id assigned by the server.
    pub update_id: i64,
    /// Decoded callback payload.
    pub payload: Map<String, Value>,
    /// The untouched update.
    pub raw: Value,
}

impl ActionEvent {
    /// Returns the payload value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// A parsed, well-formed inbound update.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A text message.
    Text(TextEvent),
    /// A button press.
    Action(ActionEvent),
}

impl InboundEvent {
    /// Parses a raw update.
    ///
    /// The update is rejected when it has no integer `update_id`, when
    /// `from.login` is missing, empty or not a string, or when its payload is
    /// neither an object nor a string holding a JSON object. A non-string
    /// `text` is treated as empty.
    pub fn from_raw(raw: &Value) -> ParseResult<Self> {
        let obj = raw.as_object().ok_or(ParseError::NotAnObject)?;
        let update_id = obj
            .get("update_id")
            .and_then(Value::as_i64)
            .ok_or(ParseError::MissingUpdateId)?;
        let sender = User::from_raw(raw)?;
        let message_id = obj.get("message_id").and_then(Value::as_i64);

        if let Some(payload) = decode_payload(obj)? {
            return Ok(Self::Action(ActionEvent {
                sender,
                message_id,
                update_id,
                payload,
                raw: raw.clone(),
            }));
        }

        let text = obj
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        Ok(Self::Text(TextEvent {
            sender,
            text,
            message_id,
            update_id,
            timestamp: obj.get("timestamp").and_then(Value::as_i64),
            raw: raw.clone(),
        }))
    }

    /// Returns the sender of this event.
    pub fn sender(&self) -> &User {
        match self {
            Self::Text(e) => &e.sender,
            Self::Action(e) => &e.sender,
        }
    }

    /// Returns the sender login.
    pub fn login(&self) -> &str {
        &self.sender().login
    }

    /// Returns the update id.
    pub fn update_id(&self) -> i64 {
        match self {
            Self::Text(e) => e.update_id,
            Self::Action(e) => e.update_id,
        }
    }

    /// Returns the trimmed text for text events.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(e) => Some(&e.text),
            Self::Action(_) => None,
        }
    }

    /// Returns the payload for action events.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Text(_) => None,
            Self::Action(e) => Some(&e.payload),
        }
    }

    /// Returns the untouched raw update.
    pub fn raw(&self) -> &Value {
        match self {
            Self::Text(e) => &e.raw,
            Self::Action(e) => &e.raw,
        }
    }

    /// A short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Action(_) => "action",
        }
    }
}

/// Finds the first non-empty payload key and decodes it.
fn decode_payload(obj: &Map<String, Value>) -> ParseResult<Option<Map<String, Value>>> {
    let raw = PAYLOAD_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| !is_empty_payload(v));

    match raw {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(ParseError::invalid_payload(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
            Err(e) => Err(ParseError::invalid_payload(e.to_string())),
        },
        Some(other) => Err(ParseError::invalid_payload(format!(
            "unsupported payload type {}",
            json_type(other)
        ))),
    }
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
