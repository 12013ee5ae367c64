//! Stage handler contracts.
//!
//! A handler runs once per committed leg. It swaps the visible screens and
//! may ask the coordinator for the next leg through a `CoordinatorHandle`;
//! such requests queue behind the leg currently being processed.

use crate::core::LegKind;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Completion entry point of one leg.
pub trait StageHandler: Send + Sync {
    fn on_transition_finished(&self);
}

/// A screen the flow can show or hide. Rendering is the implementor's job.
pub trait Panel: Send + Sync {
    fn name(&self) -> &str;
    fn set_active(&self, active: bool);
    fn is_active(&self) -> bool;
}

/// Broadcast when a panel with side flows attached becomes visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelEvent {
    PaymentPanelEnabled,
}

/// Sender half of the panel event broadcast.
pub type PanelEvents = broadcast::Sender<PanelEvent>;

pub fn panel_events() -> PanelEvents {
    let (tx, _rx) = broadcast::channel(16);
    tx
}

/// Coarse kiosk state reported to the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KioskState {
    Ready,
    Select,
    WaitingForPayment,
}

/// Receives the kiosk state whenever the flow changes it.
pub trait KioskStateSink: Send + Sync {
    fn set_state(&self, state: KioskState);
}

/// Sound effects the flow asks for. Playback is the implementor's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundCue {
    FadeIn,
    FadeOut,
    StartButton,
    OutputSuccess,
}

pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// Handler that hides one panel, shows another and optionally announces it.
pub struct PanelSwitch {
    label: &'static str,
    hide: Option<Arc<dyn Panel>>,
    show: Option<Arc<dyn Panel>>,
    announce: Option<(PanelEvents, PanelEvent)>,
}

impl PanelSwitch {
    pub fn new(label: &'static str, hide: Arc<dyn Panel>, show: Arc<dyn Panel>) -> Self {
        Self {
            label,
            hide: Some(hide),
            show: Some(show),
            announce: None,
        }
    }

    /// Switch with possibly unwired panels; missing ones are logged at run time.
    pub fn partial(
        label: &'static str,
        hide: Option<Arc<dyn Panel>>,
        show: Option<Arc<dyn Panel>>,
    ) -> Self {
        Self {
            label,
            hide,
            show,
            announce: None,
        }
    }

    /// Broadcast `event` after the shown panel is activated.
    pub fn announcing(mut self, events: PanelEvents, event: PanelEvent) -> Self {
        self.announce = Some((events, event));
        self
    }
}

impl StageHandler for PanelSwitch {
    fn on_transition_finished(&self) {
        let (Some(hide), Some(show)) = (&self.hide, &self.show) else {
            warn!(handler = self.label, "panel reference is missing");
            return;
        };

        hide.set_active(false);
        show.set_active(true);
        debug!(handler = self.label, hidden = hide.name(), shown = show.name(), "panels switched");

        if let Some((events, event)) = &self.announce {
            // No receivers simply means nobody is listening yet.
            let _ = events.send(*event);
        }
    }
}

impl fmt::Debug for PanelSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelSwitch")
            .field("label", &self.label)
            .field("hide", &self.hide.as_ref().map(|p| p.name().to_string()))
            .field("show", &self.show.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

/// One optional handler per leg. Payment completion belongs to `PaymentFlow`.
#[derive(Clone, Default)]
pub struct HandlerSet {
    pub ready_to_select: Option<Arc<dyn StageHandler>>,
    pub select_to_filming: Option<Arc<dyn StageHandler>>,
    pub session_end: Option<Arc<dyn StageHandler>>,
    pub filming_back: Option<Arc<dyn StageHandler>>,
}

impl HandlerSet {
    pub fn for_leg(&self, kind: LegKind) -> Option<&Arc<dyn StageHandler>> {
        match kind {
            LegKind::ReadyToSelect => self.ready_to_select.as_ref(),
            LegKind::SelectToFilming => self.select_to_filming.as_ref(),
            LegKind::SessionEnd => self.session_end.as_ref(),
            LegKind::FilmingBackToSelect => self.filming_back.as_ref(),
            LegKind::PaymentCompletion => None,
        }
    }

    /// Legs without a wired handler, payment completion excluded.
    pub fn missing(&self) -> Vec<LegKind> {
        [
            LegKind::ReadyToSelect,
            LegKind::SelectToFilming,
            LegKind::SessionEnd,
            LegKind::FilmingBackToSelect,
        ]
        .into_iter()
        .filter(|kind| self.for_leg(*kind).is_none())
        .collect()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("missing", &self.missing())
            .finish()
    }
}
