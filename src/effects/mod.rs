//! The imperative shell around the pure core.
//!
//! # Key Concepts
//!
//! - **Transition effect**: the visual effect gating every leg; reports
//!   completion through a one-shot `FinishedSignal`
//! - **Coordinator**: a tokio task owning the `Stage`, driven by commands
//!   sent through a cloneable `CoordinatorHandle`
//! - **Legs as effects**: each leg's side effects are a Stillwater effect
//!   run against a `FlowEnv`, committed only on success

mod coordinator;
mod error;
mod handle;
mod transition;

pub use coordinator::{leg_action, FlowEnv, StageCoordinator};
pub use error::CoordinatorError;
pub(crate) use handle::FlowCommand;
pub use handle::{flow_channel, CoordinatorHandle, FlowInbox};
pub use transition::{FadeEffect, FinishedSignal, TransitionEffect};
