//! Per-visit session state.
//!
//! Created fresh at `Idle`, filled in across selection, filming and print,
//! and replaced wholesale by the full reset.

use crate::reset::Resettable;
use crate::sync::lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrintOutcome {
    Printed { copies: u32 },
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub selected_frame: Option<String>,
    pub captured_shots: Vec<String>,
    pub print_outcome: Option<PrintOutcome>,
}

impl SessionState {
    pub fn fresh() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            selected_frame: None,
            captured_shots: Vec::new(),
            print_outcome: None,
        }
    }

    /// True when nothing has been recorded since the session started.
    pub fn is_blank(&self) -> bool {
        self.selected_frame.is_none()
            && self.captured_shots.is_empty()
            && self.print_outcome.is_none()
    }
}

/// Shared handle to the current session.
#[derive(Debug)]
pub struct KioskSession {
    state: Mutex<SessionState>,
}

impl Default for KioskSession {
    fn default() -> Self {
        Self::new()
    }
}

impl KioskSession {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::fresh()),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn id(&self) -> Uuid {
        lock(&self.state).id
    }

    pub fn select_frame(&self, frame: impl Into<String>) {
        let frame = frame.into();
        debug!(%frame, "frame selected");
        lock(&self.state).selected_frame = Some(frame);
    }

    pub fn record_shot(&self, shot: impl Into<String>) {
        let mut state = lock(&self.state);
        state.captured_shots.push(shot.into());
        debug!(shots = state.captured_shots.len(), "shot captured");
    }

    pub fn set_print_outcome(&self, outcome: PrintOutcome) {
        debug!(?outcome, "print outcome recorded");
        lock(&self.state).print_outcome = Some(outcome);
    }
}

impl Resettable for KioskSession {
    fn reset(&self) {
        let mut state = lock(&self.state);
        let previous = state.id;
        *state = SessionState::fresh();
        info!(%previous, next = %state.id, "session reset");
    }
}
