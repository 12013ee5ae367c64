//! Core flow types and logic.
//!
//! This module contains the pure core of the kiosk flow:
//! - State definitions via the `State` trait
//! - The `Stage` enum and its transition table
//! - Guard predicates for transition requests
//! - Bounded history tracking
//!
//! Nothing in this module spawns tasks or touches collaborators.

mod guard;
mod history;
mod stage;
mod state;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_LIMIT};
pub use stage::{Leg, LegKind, Stage};
pub use state::State;
