//! Inline keyboards.
//!
//! Keyboards are built row by row but the Bot API expects a single flat list
//! of buttons, so rows are flattened (row order, then button order) when a
//! keyboard is attached to an outgoing message.
//!
//! ```rust,ignore
//! let kb = Keyboard::new()
//!     .row([Button::command("Name", "ask_name"), Button::command("Help", "/help")]);
//! bot.reply("Choose an option:", Some(kb)).await;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single inline button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    /// Caption.
    pub text: String,
    /// Data echoed back in the callback update.
    #[serde(default)]
    pub callback_data: Map<String, Value>,
    /// Link opened by the button instead of sending a callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    /// A button with an empty payload.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Map::new(),
            url: None,
        }
    }

    /// A button whose payload carries `cmd`, normalized to a leading `/`.
    ///
    /// Button handlers match the command without the slash.
    pub fn command(text: impl Into<String>, cmd: &str) -> Self {
        Self::new(text).cmd(cmd)
    }

    /// Sets the `cmd` payload key, normalized to a leading `/`.
    pub fn cmd(mut self, cmd: &str) -> Self {
        let cmd = if cmd.starts_with('/') {
            cmd.to_string()
        } else {
            format!("/{cmd}")
        };
        self.callback_data.insert("cmd".into(), Value::String(cmd));
        self
    }

    /// Adds a custom payload entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.callback_data.insert(key.into(), value.into());
        self
    }

    /// Turns the button into a link button.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keyboard {
    rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Creates an empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keyboard from ready-made rows.
    pub fn from_rows(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Appends a row.
    pub fn row(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Vec<Button>] {
        &self.rows
    }

    /// Returns `true` when the keyboard has no buttons.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Flattens the rows into the list the Bot API expects.
    pub fn into_buttons(self) -> Vec<Button> {
        self.rows.into_iter().flatten().collect()
    }
}

impl From<Vec<Vec<Button>>> for Keyboard {
    fn from(rows: Vec<Vec<Button>>) -> Self {
        Self::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_is_normalized() {
        assert_eq!(
            Button::command("Help", "help").callback_data.get("cmd"),
            Some(&json!("/help"))
        );
        assert_eq!(
            Button::command("Help", "/help").callback_data.get("cmd"),
            Some(&json!("/help"))
        );
    }

    #[test]
    fn test_rows_flatten_in_order() {
        let kb = Keyboard::new()
            .row([Button::command("A", "a"), Button::command("B", "b")])
            .row([Button::new("C").with_data("hash", "abc")]);
        let texts: Vec<_> = kb.into_buttons().into_iter().map(|b| b.text).collect();
        assert_eq!(texts, ["A", "B", "C"]);
    }

    #[test]
    fn test_button_serialization() {
        let button = Button::command("Docs", "docs").url("https://example.com");
        assert_eq!(
            serde_json::to_value(&button).unwrap(),
            json!({
                "text": "Docs",
                "callback_data": {"cmd": "/docs"},
                "url": "https://example.com",
            })
        );
    }
}
