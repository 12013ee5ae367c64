//! The transition effect contract and its timed implementation.

use super::handle::FlowCommand;
use crate::handlers::{SoundCue, SoundPlayer};
use crate::sync::lock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A visual in/out effect gating every stage change.
///
/// The effect knows nothing about stages. It receives a `FinishedSignal`
/// per run and fires it once the effect completes.
pub trait TransitionEffect: Send + Sync {
    fn start(&self, finished: FinishedSignal);
}

/// One-shot completion signal for a single effect run.
///
/// `fire` consumes the signal, so a run can complete at most once.
#[derive(Debug)]
pub struct FinishedSignal {
    commands: mpsc::UnboundedSender<FlowCommand>,
}

impl FinishedSignal {
    pub(crate) fn new(commands: mpsc::UnboundedSender<FlowCommand>) -> Self {
        Self { commands }
    }

    pub fn fire(self) {
        if self.commands.send(FlowCommand::Finished).is_err() {
            debug!("finished signal dropped: coordinator is gone");
        }
    }
}

/// Fade that completes after a fixed duration.
///
/// A start arriving while a fade runs is queued and gets its own full run
/// once the current one fires, so every signal fires exactly once.
pub struct FadeEffect {
    duration: Duration,
    sounds: Option<Arc<dyn SoundPlayer>>,
    state: Arc<Mutex<FadeState>>,
}

#[derive(Default)]
struct FadeState {
    running: bool,
    queued: VecDeque<FinishedSignal>,
}

impl FadeEffect {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            sounds: None,
            state: Arc::new(Mutex::new(FadeState::default())),
        }
    }

    /// Play the fade in and fade out cues around every run.
    pub fn with_sounds(mut self, sounds: Arc<dyn SoundPlayer>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn queued(&self) -> usize {
        lock(&self.state).queued.len()
    }
}

impl TransitionEffect for FadeEffect {
    fn start(&self, finished: FinishedSignal) {
        {
            let mut state = lock(&self.state);
            if state.running {
                state.queued.push_back(finished);
                warn!(queued = state.queued.len(), "fade already running, start queued");
                return;
            }
            state.running = true;
        }

        let state = Arc::clone(&self.state);
        let sounds = self.sounds.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            let mut signal = finished;
            loop {
                debug!(duration_ms = duration.as_millis() as u64, "fade in");
                play(&sounds, SoundCue::FadeIn);
                tokio::time::sleep(duration).await;
                debug!("fade out");
                play(&sounds, SoundCue::FadeOut);
                signal.fire();

                let next = {
                    let mut state = lock(&state);
                    let next = state.queued.pop_front();
                    state.running = next.is_some();
                    next
                };
                match next {
                    Some(queued) => signal = queued,
                    None => break,
                }
            }
        });
    }
}

fn play(sounds: &Option<Arc<dyn SoundPlayer>>, cue: SoundCue) {
    if let Some(sounds) = sounds {
        sounds.play(cue);
    }
}

impl fmt::Debug for FadeEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FadeEffect")
            .field("duration", &self.duration)
            .field("sounds", &self.sounds.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}
