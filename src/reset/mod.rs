//! Full reset sequencing and the unattended auto-reset countdown.

use crate::config::ResetConfig;
use crate::core::Stage;
use crate::effects::CoordinatorHandle;
use crate::handlers::{SoundCue, SoundPlayer};
use crate::sync::lock;
use crate::task::TaskGuard;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A collaborator owning per-session state that can return to defaults.
pub trait Resettable: Send + Sync {
    fn reset(&self);
}

/// Label showing the auto-reset countdown.
pub trait CountdownDisplay: Send + Sync {
    fn show_remaining(&self, seconds: u32);
    fn show_idle(&self);
}

struct ResetStep {
    name: &'static str,
    target: Arc<dyn Resettable>,
}

/// The running countdown and the generation it was started under.
struct Countdown {
    generation: u64,
    guard: TaskGuard,
}

pub struct ResetCoordinator {
    steps: Vec<ResetStep>,
    countdown_secs: u32,
    display: Option<Arc<dyn CountdownDisplay>>,
    coordinator: Option<CoordinatorHandle>,
    sounds: Option<Arc<dyn SoundPlayer>>,
    countdown: Mutex<Option<Countdown>>,
    generation: AtomicU64,
    resets: AtomicU64,
}

impl ResetCoordinator {
    pub fn new(config: &ResetConfig) -> Self {
        Self {
            steps: Vec::new(),
            countdown_secs: config.countdown_secs.max(1),
            display: None,
            coordinator: None,
            sounds: None,
            countdown: Mutex::new(None),
            generation: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    /// Register a reset step. Steps run in registration order.
    pub fn with_step(mut self, name: &'static str, target: Arc<dyn Resettable>) -> Self {
        self.steps.push(ResetStep { name, target });
        self
    }

    pub fn with_display(mut self, display: Arc<dyn CountdownDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    /// Coordinator asked to run the pending leg after an unattended reset.
    pub fn with_coordinator(mut self, coordinator: CoordinatorHandle) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn with_sounds(mut self, sounds: Arc<dyn SoundPlayer>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    pub fn countdown_secs(&self) -> u32 {
        self.countdown_secs
    }

    /// Cancel any pending countdown and reset every registered collaborator.
    pub fn run_full_reset(&self) {
        self.cancel_countdown();
        if let Some(display) = &self.display {
            display.show_idle();
        }
        for step in &self.steps {
            debug!(step = step.name, "resetting");
            step.target.reset();
        }
        let total = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        info!(steps = self.steps.len(), total, "full reset complete");
    }

    /// End the session now: play the success cue, reset everything and ask
    /// the coordinator to run the pending leg.
    ///
    /// This is what the countdown does on expiry, and what a "return now"
    /// button calls directly. Nothing is requested while the stage is
    /// already `Idle`.
    pub fn reset_and_return(&self) {
        if let Some(sounds) = &self.sounds {
            sounds.play(SoundCue::OutputSuccess);
        }
        self.run_full_reset();

        let Some(coordinator) = &self.coordinator else {
            debug!("no coordinator wired, stage left as is");
            return;
        };
        let stage = coordinator.stage();
        if stage == Stage::Idle {
            debug!("already idle after reset");
            return;
        }
        info!(%stage, "advancing flow after reset");
        if let Err(err) = coordinator.advance() {
            warn!(error = %err, "could not advance flow after reset");
        }
    }

    /// Start the auto-reset countdown, replacing a running one.
    pub fn start_countdown(self: &Arc<Self>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let owner = Arc::downgrade(self);
        let secs = self.countdown_secs;

        // Held across the spawn so the new task cannot claim its expiry
        // before it is stored.
        let mut slot = lock(&self.countdown);
        let guard = TaskGuard::spawn(
            "auto_reset_countdown",
            countdown(owner, generation, secs),
        );
        // The previous countdown, if any, aborts when `previous` drops.
        let previous = slot.replace(Countdown { generation, guard });
        drop(slot);
        if previous.is_some() {
            debug!(generation, "auto-reset countdown restarted");
        } else {
            debug!(generation, secs, "auto-reset countdown started");
        }
    }

    /// Cancel a pending countdown. Safe to call when none is running.
    pub fn cancel_countdown(&self) {
        if let Some(mut countdown) = lock(&self.countdown).take() {
            countdown.guard.cancel();
            debug!(generation = countdown.generation, "auto-reset countdown cancelled");
        }
    }

    pub fn is_counting_down(&self) -> bool {
        lock(&self.countdown)
            .as_ref()
            .is_some_and(|countdown| countdown.guard.is_running())
    }

    pub fn resets_run(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Release the countdown slot if `generation` still owns it.
    ///
    /// A countdown replaced after its last sleep finds a newer generation
    /// here and must not reset.
    fn claim_expiry(&self, generation: u64) -> bool {
        let mut slot = lock(&self.countdown);
        match slot.take() {
            Some(countdown) if countdown.generation == generation => {
                countdown.guard.detach();
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }
}

async fn countdown(owner: Weak<ResetCoordinator>, generation: u64, secs: u32) {
    for remaining in (1..=secs).rev() {
        {
            let Some(owner) = owner.upgrade() else { return };
            if let Some(display) = &owner.display {
                display.show_remaining(remaining);
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let Some(owner) = owner.upgrade() else { return };
    if !owner.claim_expiry(generation) {
        debug!(generation, "superseded countdown expired, ignored");
        return;
    }
    info!(generation, "auto-reset countdown expired");
    owner.reset_and_return();
}

impl fmt::Debug for ResetCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetCoordinator")
            .field("steps", &self.step_names())
            .field("countdown_secs", &self.countdown_secs)
            .field("coordinator", &self.coordinator.is_some())
            .field("resets", &self.resets_run())
            .finish()
    }
}
