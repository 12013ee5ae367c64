//! In-memory collaborators.
//!
//! Stand-ins for the screens, text widgets and effect driver of a real
//! kiosk. Used for headless runs, the demo and tests.

use crate::effects::{FinishedSignal, TransitionEffect};
use crate::handlers::{KioskState, KioskStateSink, Panel, SoundCue, SoundPlayer, StageHandler};
use crate::payment::{IndicatorSink, StatusText};
use crate::reset::{CountdownDisplay, Resettable};
use crate::sync::lock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Panel that only remembers whether it is visible.
#[derive(Debug)]
pub struct MemoryPanel {
    name: String,
    active: AtomicBool,
}

impl MemoryPanel {
    pub fn shown(name: &str) -> Arc<Self> {
        Self::with_state(name, true)
    }

    pub fn hidden(name: &str) -> Arc<Self> {
        Self::with_state(name, false)
    }

    fn with_state(name: &str, active: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: AtomicBool::new(active),
        })
    }
}

impl Panel for MemoryPanel {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_active(&self, active: bool) {
        debug!(panel = %self.name, active, "panel visibility");
        self.active.store(active, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Handler counting its invocations.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    calls: AtomicUsize,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StageHandler for RecordingHandler {
    fn on_transition_finished(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Effect whose runs complete only when `fire` is called.
#[derive(Debug, Default)]
pub struct ManualEffect {
    starts: AtomicUsize,
    pending: Mutex<Vec<FinishedSignal>>,
}

impl ManualEffect {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Complete the oldest pending run. Returns false when none is pending.
    pub fn fire(&self) -> bool {
        let signal = {
            let mut pending = lock(&self.pending);
            if pending.is_empty() {
                return false;
            }
            pending.remove(0)
        };
        signal.fire();
        true
    }
}

impl TransitionEffect for ManualEffect {
    fn start(&self, finished: FinishedSignal) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        lock(&self.pending).push(finished);
    }
}

/// Text widget keeping every value it was given.
#[derive(Debug, Default)]
pub struct MemoryText {
    history: Mutex<Vec<String>>,
}

impl MemoryText {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.history).last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }
}

impl StatusText for MemoryText {
    fn set_text(&self, text: &str) {
        lock(&self.history).push(text.to_string());
    }
}

/// Countdown label recording shown seconds; `None` marks the idle label.
#[derive(Debug, Default)]
pub struct MemoryCountdown {
    shown: Mutex<Vec<Option<u32>>>,
}

impl MemoryCountdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<Option<u32>> {
        lock(&self.shown).clone()
    }
}

impl CountdownDisplay for MemoryCountdown {
    fn show_remaining(&self, seconds: u32) {
        lock(&self.shown).push(Some(seconds));
    }

    fn show_idle(&self) {
        lock(&self.shown).push(None);
    }
}

/// Spinner recording visibility and the last angle drawn.
#[derive(Debug, Default)]
pub struct MemoryIndicator {
    visible: AtomicBool,
    angles: Mutex<Vec<f32>>,
}

impl MemoryIndicator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn angles(&self) -> Vec<f32> {
        lock(&self.angles).clone()
    }
}

impl IndicatorSink for MemoryIndicator {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn set_angle(&self, degrees: f32) {
        lock(&self.angles).push(degrees);
    }
}

/// Reset target counting how often it was reset.
#[derive(Debug, Default)]
pub struct CountingReset {
    count: AtomicUsize,
}

impl CountingReset {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Resettable for CountingReset {
    fn reset(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// State sink keeping every reported kiosk state.
#[derive(Debug, Default)]
pub struct MemoryKioskState {
    states: Mutex<Vec<KioskState>>,
}

impl MemoryKioskState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn states(&self) -> Vec<KioskState> {
        lock(&self.states).clone()
    }

    pub fn current(&self) -> Option<KioskState> {
        lock(&self.states).last().copied()
    }
}

impl KioskStateSink for MemoryKioskState {
    fn set_state(&self, state: KioskState) {
        lock(&self.states).push(state);
    }
}

/// Sound player recording cues in the order they were played.
#[derive(Debug, Default)]
pub struct MemoryCues {
    played: Mutex<Vec<SoundCue>>,
}

impl MemoryCues {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn played(&self) -> Vec<SoundCue> {
        lock(&self.played).clone()
    }

    pub fn count(&self, cue: SoundCue) -> usize {
        lock(&self.played).iter().filter(|c| **c == cue).count()
    }
}

impl SoundPlayer for MemoryCues {
    fn play(&self, cue: SoundCue) {
        lock(&self.played).push(cue);
    }
}
