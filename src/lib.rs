//! Kiosk Flow: stage coordination for linear kiosk flows
//!
//! A kiosk walks every visitor through the same loop: ready screen, frame
//! selection, filming, payment, and back to ready. Each step is gated by a
//! visual transition effect, and payment can hold the loop on its own
//! pending/approved/failed cycle.
//!
//! The crate follows a "pure core, imperative shell" split:
//!
//! - **core**: the `Stage` enum and its exhaustive transition table,
//!   guards and bounded history. No I/O, no tasks.
//! - **effects**: the `StageCoordinator` actor owning the stage, the
//!   `TransitionEffect` contract and the handle everything else talks to.
//! - **payment**, **reset**, **session**: the side flows a leg touches.
//!
//! # Example
//!
//! ```rust
//! use kiosk_flow::core::{LegKind, Stage};
//!
//! let mut stage = Stage::Idle;
//! let mut legs = Vec::new();
//! while let Some(leg) = stage.leg() {
//!     legs.push(leg.kind);
//!     stage = leg.to;
//!     if stage == Stage::Idle {
//!         break;
//!     }
//! }
//!
//! assert_eq!(
//!     legs,
//!     vec![
//!         LegKind::ReadyToSelect,
//!         LegKind::SelectToFilming,
//!         LegKind::SessionEnd,
//!         LegKind::PaymentCompletion,
//!     ]
//! );
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod effects;
pub mod handlers;
pub mod payment;
pub mod reset;
pub mod session;
pub mod sim;
pub mod task;
pub mod telemetry;

mod sync;

// Re-export commonly used types
pub use builder::{BuildError, Kiosk, KioskBuilder, KioskPanels};
pub use config::{ConfigError, KioskConfig};
pub use crate::core::{Guard, LegKind, Stage, State, StateHistory, StateTransition};
pub use effects::{CoordinatorError, CoordinatorHandle, StageCoordinator, TransitionEffect};
pub use payment::{PaymentError, PaymentFlow, PaymentOutcome};
pub use reset::ResetCoordinator;
pub use session::KioskSession;
