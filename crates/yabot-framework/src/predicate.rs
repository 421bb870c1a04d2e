//! Predicate combinators for handler filters.
//!
//! A [`Predicate`] is a cheap-to-clone boolean test over an [`InboundEvent`].
//! Combinators short-circuit left to right:
//!
//! ```rust,ignore
//! let vip = key_eq("tier", "gold").or(key_eq("tier", "platinum"));
//! let filter = has_key("hash").and(vip).and(in_state([AppState::Main]).not());
//! ```
//!
//! Predicates run inside the dispatch scope, which is what [`in_state`] reads.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use yabot_core::{InboundEvent, StateLabel, scope};

/// A composable boolean test over an event.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&InboundEvent) -> bool + Send + Sync>);

impl Predicate {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&InboundEvent) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluates the predicate.
    pub fn check(&self, event: &InboundEvent) -> bool {
        (self.0)(event)
    }

    /// Both hold. `other` is not evaluated when `self` is false.
    pub fn and(self, other: Predicate) -> Predicate {
        and(self, other)
    }

    /// Either holds. `other` is not evaluated when `self` is true.
    pub fn or(self, other: Predicate) -> Predicate {
        or(self, other)
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        not(self)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").finish_non_exhaustive()
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// `p && q`
pub fn and(p: Predicate, q: Predicate) -> Predicate {
    Predicate::new(move |e| p.check(e) && q.check(e))
}

/// `p || q`
pub fn or(p: Predicate, q: Predicate) -> Predicate {
    Predicate::new(move |e| p.check(e) || q.check(e))
}

/// `!p`
pub fn not(p: Predicate) -> Predicate {
    Predicate::new(move |e| !p.check(e))
}

/// All predicates hold; true for an empty list.
pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<_> = predicates.into_iter().collect();
    Predicate::new(move |e| predicates.iter().all(|p| p.check(e)))
}

/// Any predicate holds; false for an empty list.
pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<_> = predicates.into_iter().collect();
    Predicate::new(move |e| predicates.iter().any(|p| p.check(e)))
}

// =============================================================================
// Builders
// =============================================================================

/// Always true.
pub fn always() -> Predicate {
    Predicate::new(|_| true)
}

/// The trimmed message text equals `text`. False for button presses.
pub fn text_eq(text: impl Into<String>) -> Predicate {
    let text = text.into();
    Predicate::new(move |e| e.text() == Some(text.as_str()))
}

/// The button payload contains `key`. False for text messages.
pub fn has_key(key: impl Into<String>) -> Predicate {
    let key = key.into();
    Predicate::new(move |e| e.payload().is_some_and(|p| p.contains_key(&key)))
}

/// The button payload maps `key` to `value`. False for text messages.
pub fn key_eq(key: impl Into<String>, value: impl Into<Value>) -> Predicate {
    let key = key.into();
    let value = value.into();
    Predicate::new(move |e| e.payload().and_then(|p| p.get(&key)) == Some(&value))
}

/// The sender's FSM label is one of `states`.
///
/// Reads the current scope; false outside of one or when the sender has no
/// label.
pub fn in_state<I, S>(states: I) -> Predicate
where
    I: IntoIterator<Item = S>,
    S: Into<StateLabel>,
{
    let allowed: HashSet<StateLabel> = states.into_iter().map(Into::into).collect();
    Predicate::new(move |_| {
        let Some(scope) = scope::current() else {
            return false;
        };
        scope
            .bot
            .fsm()
            .get(&scope.sender)
            .is_some_and(|state| allowed.contains(&state))
    })
}
