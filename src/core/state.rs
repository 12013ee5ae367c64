//! Core State trait for flow states.
//!
//! Anything the coordinator tracks or records (the kiosk `Stage`, the
//! payment outcome) implements this trait, which provides pure methods
//! for inspecting a state without side effects.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for flow states.
///
/// All methods are pure - no side effects. States are small immutable
/// values describing a position in the flow.
///
/// # Required Traits
///
/// - `Clone`: states are copied into history records
/// - `PartialEq`: guards and the transition table compare states
/// - `Debug`: states show up in logs and errors
/// - `Serialize` + `Deserialize`: history snapshots are serializable
///
/// # Example
///
/// ```rust
/// use kiosk_flow::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Closed,
///     Opening,
///     Open,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Closed => "Closed",
///             Self::Opening => "Opening",
///             Self::Open => "Open",
///         }
///     }
///
///     fn is_resting(&self) -> bool {
///         matches!(self, Self::Closed)
///     }
/// }
///
/// assert!(Door::Closed.is_resting());
/// assert_eq!(Door::Opening.name(), "Opening");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is the resting state the flow returns to between
    /// sessions.
    ///
    /// Default implementation returns `false`.
    fn is_resting(&self) -> bool {
        false
    }

    /// Check if this state represents a failure the user has to act on.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum Lamp {
        Off,
        Warming,
        On,
        Broken,
    }

    impl State for Lamp {
        fn name(&self) -> &str {
            match self {
                Self::Off => "Off",
                Self::Warming => "Warming",
                Self::On => "On",
                Self::Broken => "Broken",
            }
        }

        fn is_resting(&self) -> bool {
            matches!(self, Self::Off)
        }

        fn is_error(&self) -> bool {
            matches!(self, Self::Broken)
        }
    }

    #[test]
    fn defaults_are_overridable() {
        assert!(Lamp::Off.is_resting());
        assert!(!Lamp::On.is_resting());
        assert!(Lamp::Broken.is_error());
        assert!(!Lamp::Warming.is_error());
    }

    #[test]
    fn state_serializes_correctly() {
        let state = Lamp::Warming;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: Lamp = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
        assert_eq!(deserialized.name(), "Warming");
    }
}
