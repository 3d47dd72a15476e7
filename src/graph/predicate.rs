//! Routing predicates and their combinators.
//!
//! A predicate is a pure function over [`State`] returning a boolean
//! transition decision. Edges without a predicate are unconditional; edges
//! with one transition only when it evaluates true.

use std::sync::Arc;

use serde_json::Value;

use crate::state::State;

/// Pure routing decision over state.
pub type TransitionPredicate = Arc<dyn Fn(&State) -> bool + Send + Sync>;

/// Always transitions.
#[must_use]
pub fn always() -> TransitionPredicate {
    Arc::new(|_| true)
}

/// True when `key` is present, whatever its value.
#[must_use]
pub fn key_exists(key: impl Into<String>) -> TransitionPredicate {
    let key = key.into();
    Arc::new(move |state| state.get(&key).is_some())
}

/// True when `key` is present and equal to `value`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use orchestrion::graph::key_equals;
/// use orchestrion::state::State;
///
/// let approved = key_equals("status", json!("approved"));
/// let state = State::new(None).set("status", json!("approved"));
/// assert!(approved(&state));
/// assert!(!approved(&State::new(None)));
/// ```
#[must_use]
pub fn key_equals(key: impl Into<String>, value: Value) -> TransitionPredicate {
    let key = key.into();
    Arc::new(move |state| state.get(&key) == Some(&value))
}

/// Negates a predicate.
#[must_use]
pub fn not(predicate: TransitionPredicate) -> TransitionPredicate {
    Arc::new(move |state| !predicate(state))
}

/// True when every predicate is true. Vacuously true for an empty set.
#[must_use]
pub fn and(predicates: Vec<TransitionPredicate>) -> TransitionPredicate {
    Arc::new(move |state| predicates.iter().all(|p| p(state)))
}

/// True when any predicate is true. Vacuously false for an empty set.
#[must_use]
pub fn or(predicates: Vec<TransitionPredicate>) -> TransitionPredicate {
    Arc::new(move |state| predicates.iter().any(|p| p(state)))
}
