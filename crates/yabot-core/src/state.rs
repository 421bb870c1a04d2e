//! Per-user state: the FSM label store and the free-form user data store.
//!
//! Both stores are cheap-to-clone handles over shared maps keyed by sender
//! login. They live for the life of the process and are never persisted.
//!
//! The FSM store offers no read-modify-write atomicity. Concurrent units for
//! the same sender are kept apart by the scheduler's per-sender lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// StateLabel
// =============================================================================

/// An opaque FSM state name.
///
/// Applications usually define their own enum and convert it:
///
/// ```rust,ignore
/// enum AppState { Main, WaitName }
///
/// impl From<AppState> for StateLabel {
///     fn from(s: AppState) -> Self {
///         match s {
///             AppState::Main => StateLabel::new("main"),
///             AppState::WaitName => StateLabel::new("wait_name"),
///         }
///     }
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateLabel(Arc<str>);

impl StateLabel {
    /// Creates a label.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateLabel({})", &self.0)
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateLabel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StateLabel {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&StateLabel> for StateLabel {
    fn from(s: &StateLabel) -> Self {
        s.clone()
    }
}

impl AsRef<str> for StateLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// FsmStore
// =============================================================================

/// Holds at most one [`StateLabel`] per sender. Last writer wins.
#[derive(Clone, Default)]
pub struct FsmStore {
    inner: Arc<RwLock<HashMap<String, StateLabel>>>,
}

impl FsmStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current label of `login`.
    pub fn get(&self, login: &str) -> Option<StateLabel> {
        self.inner.read().get(login).cloned()
    }

    /// Sets the label of `login`; `None` removes it.
    pub fn set<S: Into<StateLabel>>(&self, login: &str, state: Option<S>) {
        let mut map = self.inner.write();
        match state {
            Some(state) => {
                map.insert(login.to_string(), state.into());
            }
            None => {
                map.remove(login);
            }
        }
    }

    /// Removes the label of `login`.
    pub fn clear(&self, login: &str) {
        self.inner.write().remove(login);
    }

    /// Number of senders with a label.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` when no sender has a label.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl fmt::Debug for FsmStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmStore")
            .field("entries", &self.len())
            .finish()
    }
}

// =============================================================================
// UserData
// =============================================================================

/// Free-form key/value data of one sender, kept apart from the FSM label.
///
/// Handles returned for the same login share storage.
#[derive(Clone, Default)]
pub struct UserData {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl UserData {
    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.lock().insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.lock().remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Runs `f` with exclusive access to the map.
    pub fn with<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Returns a copy of the whole map.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.lock().clone()
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.lock().iter()).finish()
    }
}

/// Lazily creates one [`UserData`] per sender.
#[derive(Clone, Default)]
pub struct UserDataStore {
    inner: Arc<Mutex<HashMap<String, UserData>>>,
}

impl UserDataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the data of `login`, creating it on first use.
    pub fn entry(&self, login: &str) -> UserData {
        self.inner
            .lock()
            .entry(login.to_string())
            .or_default()
            .clone()
    }

    /// Drops the data of `login`.
    pub fn remove(&self, login: &str) -> Option<UserData> {
        self.inner.lock().remove(login)
    }
}

impl fmt::Debug for UserDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDataStore")
            .field("users", &self.inner.lock().len())
            .finish()
    }
}
