//! Kiosk stages and the transition table.
//!
//! A `Stage` names what the next `Finished` event of the transition effect
//! will do. The table lives in [`Stage::leg`], a pure exhaustive match, so
//! every stage either maps to exactly one leg or explicitly to none.

use super::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of the kiosk in its linear lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Stage {
    /// Ready screen; the next leg opens frame selection.
    Idle,
    /// Frame selection; the next leg opens filming.
    AwaitingSelectTransition,
    /// Filming/printing; the next leg ends the session and opens payment.
    AwaitingFilmingTransition,
    /// Reserved; has no leg in the table.
    AwaitingReturnTransition,
    /// Payment screen; the next leg completes payment and returns to idle.
    PaymentReturn,
    /// Back action requested from filming; the next leg reopens selection.
    BackToSelect,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Idle,
        Stage::AwaitingSelectTransition,
        Stage::AwaitingFilmingTransition,
        Stage::AwaitingReturnTransition,
        Stage::PaymentReturn,
        Stage::BackToSelect,
    ];

    /// The leg a `Finished` event runs from this stage.
    ///
    /// `None` means the stage is not in the table: the coordinator logs it
    /// and leaves the stage untouched.
    pub fn leg(self) -> Option<Leg> {
        let (kind, to) = match self {
            Stage::PaymentReturn => (LegKind::PaymentCompletion, Stage::Idle),
            Stage::Idle => (LegKind::ReadyToSelect, Stage::AwaitingSelectTransition),
            Stage::AwaitingSelectTransition => {
                (LegKind::SelectToFilming, Stage::AwaitingFilmingTransition)
            }
            Stage::AwaitingFilmingTransition => (LegKind::SessionEnd, Stage::PaymentReturn),
            Stage::BackToSelect => (LegKind::FilmingBackToSelect, Stage::AwaitingSelectTransition),
            Stage::AwaitingReturnTransition => return None,
        };
        Some(Leg {
            from: self,
            to,
            kind,
        })
    }
}

impl State for Stage {
    fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingSelectTransition => "AwaitingSelectTransition",
            Self::AwaitingFilmingTransition => "AwaitingFilmingTransition",
            Self::AwaitingReturnTransition => "AwaitingReturnTransition",
            Self::PaymentReturn => "PaymentReturn",
            Self::BackToSelect => "BackToSelect",
        }
    }

    fn is_resting(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stage handler a leg hands control to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LegKind {
    ReadyToSelect,
    SelectToFilming,
    SessionEnd,
    PaymentCompletion,
    FilmingBackToSelect,
}

impl LegKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadyToSelect => "ready_to_select",
            Self::SelectToFilming => "select_to_filming",
            Self::SessionEnd => "session_end",
            Self::PaymentCompletion => "payment_completion",
            Self::FilmingBackToSelect => "filming_back_to_select",
        }
    }
}

/// One row of the transition table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Leg {
    pub from: Stage,
    pub to: Stage,
    pub kind: LegKind,
}
