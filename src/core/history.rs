//! Bounded transition history.
//!
//! A kiosk runs for days, so the history keeps only the most recent
//! records. Sequence numbers keep counting across evictions.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use kiosk_flow::core::{Stage, StateTransition};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: Stage::Idle,
///     to: Stage::AwaitingSelectTransition,
///     timestamp: Utc::now(),
///     sequence: 1,
/// };
/// assert_eq!(transition.sequence, 1);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
    /// Monotonic number of the transition since the history was created
    pub sequence: u64,
}

/// Ordered, bounded history of transitions.
///
/// # Example
///
/// ```rust
/// use kiosk_flow::core::{Stage, StateHistory};
///
/// let mut history = StateHistory::with_limit(2);
/// history.record(Stage::Idle, Stage::AwaitingSelectTransition);
/// history.record(Stage::AwaitingSelectTransition, Stage::AwaitingFilmingTransition);
/// history.record(Stage::AwaitingFilmingTransition, Stage::PaymentReturn);
///
/// assert_eq!(history.transitions().len(), 2);
/// assert_eq!(history.total_recorded(), 3);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: VecDeque<StateTransition<S>>,
    limit: usize,
    recorded: u64,
}

pub const DEFAULT_HISTORY_LIMIT: usize = 64;

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl<S: State> StateHistory<S> {
    /// Create an empty history keeping at most `limit` records (at least one).
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            transitions: VecDeque::with_capacity(limit),
            limit,
            recorded: 0,
        }
    }

    /// Record a transition committed now, evicting the oldest record when full.
    pub fn record(&mut self, from: S, to: S) -> &StateTransition<S> {
        if self.transitions.len() == self.limit {
            self.transitions.pop_front();
        }
        self.recorded += 1;
        self.transitions.push_back(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            sequence: self.recorded,
        });
        &self.transitions[self.transitions.len() - 1]
    }

    /// States traversed by the retained records, oldest first.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.front() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> Vec<StateTransition<S>> {
        self.transitions.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.back()
    }

    /// Number of transitions ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
