//! Coordinator errors.
//!
//! None of these are fatal: each leaves the flow in a stable stage that
//! can be observed and recovered from.

use crate::core::Stage;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinatorError {
    #[error("Required collaborator '{0}' is missing")]
    MissingCollaborator(&'static str),

    #[error("Stage '{stage}' has no transition leg")]
    UnrecognizedStage { stage: Stage },

    #[error("Transition to '{requested}' rejected: a transition from '{current}' is still in flight")]
    ReentrantRequest { current: Stage, requested: Stage },

    #[error("Finished received at '{stage}' with no transition in flight")]
    NoTransitionInFlight { stage: Stage },

    #[error("Guard blocked transition from '{from}' to '{to}'")]
    GuardBlocked { from: Stage, to: Stage },

    #[error("Payment return leg needs an approved payment")]
    PaymentNotApproved,

    #[error("Coordinator has shut down")]
    Closed,
}
