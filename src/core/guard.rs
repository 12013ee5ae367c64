//! Guard predicates for controlling transition requests.
//!
//! Guards are pure boolean functions over the current state. The
//! coordinator evaluates the guard registered for a requested stage before
//! starting the transition effect.

use super::state::State;
use std::fmt;
use std::sync::Arc;

/// Pure predicate that decides whether a request may proceed from the
/// current state.
///
/// # Example
///
/// ```rust
/// use kiosk_flow::core::{Guard, Stage};
///
/// let only_while_filming = Guard::only_from([Stage::AwaitingFilmingTransition]);
///
/// assert!(only_while_filming.check(&Stage::AwaitingFilmingTransition));
/// assert!(!only_while_filming.check(&Stage::Idle));
/// ```
pub struct Guard<S: State> {
    predicate: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S: State> Guard<S> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Guard that passes only when the current state is one of `states`.
    pub fn only_from<I>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: 'static,
    {
        let allowed: Vec<S> = states.into_iter().collect();
        Self::new(move |s| allowed.contains(s))
    }

    /// Check if the guard allows a request from this state.
    pub fn check(&self, state: &S) -> bool {
        (self.predicate)(state)
    }
}

impl<S: State> Clone for Guard<S> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S: State> fmt::Debug for Guard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
