//! Assembles collaborators into a running kiosk.

use crate::builder::error::BuildError;
use crate::config::KioskConfig;
use crate::core::{Guard, Stage};
use crate::effects::{
    flow_channel, CoordinatorHandle, FadeEffect, FlowEnv, FlowInbox, StageCoordinator,
    TransitionEffect,
};
use crate::handlers::{
    panel_events, HandlerSet, KioskStateSink, Panel, PanelEvent, PanelEvents, PanelSwitch,
    SoundPlayer, StageHandler,
};
use crate::payment::{IndicatorSink, LoadingIndicator, PaymentFlow, StatusText};
use crate::reset::{CountdownDisplay, ResetCoordinator, Resettable};
use crate::session::KioskSession;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The four screens of the standard flow.
#[derive(Clone)]
pub struct KioskPanels {
    pub ready: Arc<dyn Panel>,
    pub select: Arc<dyn Panel>,
    pub filming: Arc<dyn Panel>,
    pub payment: Arc<dyn Panel>,
}

/// Fluent builder for a [`Kiosk`].
///
/// The coordinator handle exists as soon as the builder does, so handlers
/// that request follow-up legs can be built against [`KioskBuilder::handle`]
/// before `build` is called.
pub struct KioskBuilder {
    config: KioskConfig,
    handle: CoordinatorHandle,
    inbox: FlowInbox,
    events: PanelEvents,
    effect: Option<Arc<dyn TransitionEffect>>,
    timed_fade: bool,
    handlers: HandlerSet,
    guards: Vec<(Stage, Guard<Stage>)>,
    payment_panels: Option<(Arc<dyn Panel>, Arc<dyn Panel>)>,
    status: Option<Arc<dyn StatusText>>,
    indicator_sink: Option<Arc<dyn IndicatorSink>>,
    countdown_display: Option<Arc<dyn CountdownDisplay>>,
    state_sink: Option<Arc<dyn KioskStateSink>>,
    sounds: Option<Arc<dyn SoundPlayer>>,
    reset_steps: Vec<(&'static str, Arc<dyn Resettable>)>,
}

impl KioskBuilder {
    pub fn new(config: KioskConfig) -> Self {
        let (handle, inbox) = flow_channel(Stage::Idle);
        Self {
            config,
            handle,
            inbox,
            events: panel_events(),
            effect: None,
            timed_fade: false,
            handlers: HandlerSet::default(),
            guards: Vec::new(),
            payment_panels: None,
            status: None,
            indicator_sink: None,
            countdown_display: None,
            state_sink: None,
            sounds: None,
            reset_steps: Vec::new(),
        }
    }

    /// Handle to the coordinator that `build` will start.
    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    /// Stage to start from. Defaults to `Idle`.
    pub fn initial(self, stage: Stage) -> Self {
        self.inbox.stage.send_replace(stage);
        self
    }

    pub fn effect(mut self, effect: Arc<dyn TransitionEffect>) -> Self {
        self.effect = Some(effect);
        self.timed_fade = false;
        self
    }

    /// Use a `FadeEffect` lasting `transition.fade_duration_ms`.
    ///
    /// The fade is built by `build`, so it plays through the sound player
    /// whichever order the two are set in.
    pub fn timed_fade(mut self) -> Self {
        self.effect = None;
        self.timed_fade = true;
        self
    }

    pub fn ready_to_select(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.ready_to_select = Some(handler);
        self
    }

    pub fn select_to_filming(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.select_to_filming = Some(handler);
        self
    }

    pub fn session_end(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.session_end = Some(handler);
        self
    }

    pub fn filming_back(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.filming_back = Some(handler);
        self
    }

    /// Wire the standard screen switches for every leg.
    ///
    /// The session-end switch announces `PaymentPanelEnabled` so the payment
    /// flow starts once its panel is visible.
    pub fn panels(self, panels: KioskPanels) -> Self {
        let events = self.events.clone();
        let ready_to_select = PanelSwitch::new(
            "ready_to_select",
            panels.ready.clone(),
            panels.select.clone(),
        );
        let select_to_filming = PanelSwitch::new(
            "select_to_filming",
            panels.select.clone(),
            panels.filming.clone(),
        );
        let session_end = PanelSwitch::new(
            "session_end",
            panels.filming.clone(),
            panels.payment.clone(),
        )
        .announcing(events, PanelEvent::PaymentPanelEnabled);
        let filming_back = PanelSwitch::new(
            "filming_back_to_select",
            panels.filming.clone(),
            panels.select.clone(),
        );

        self.ready_to_select(Arc::new(ready_to_select))
            .select_to_filming(Arc::new(select_to_filming))
            .session_end(Arc::new(session_end))
            .filming_back(Arc::new(filming_back))
            .payment_panels(panels.payment, panels.ready)
    }

    /// Only accept requests for `target` while `guard` accepts the current stage.
    pub fn entry_guard(mut self, target: Stage, guard: Guard<Stage>) -> Self {
        self.guards.push((target, guard));
        self
    }

    /// Panels swapped when the payment return leg completes.
    pub fn payment_panels(mut self, payment: Arc<dyn Panel>, ready: Arc<dyn Panel>) -> Self {
        self.payment_panels = Some((payment, ready));
        self
    }

    pub fn status_text(mut self, status: Arc<dyn StatusText>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn indicator_sink(mut self, sink: Arc<dyn IndicatorSink>) -> Self {
        self.indicator_sink = Some(sink);
        self
    }

    pub fn countdown_display(mut self, display: Arc<dyn CountdownDisplay>) -> Self {
        self.countdown_display = Some(display);
        self
    }

    /// Receives `Ready`, `Select` and `WaitingForPayment` as the flow moves.
    pub fn state_sink(mut self, sink: Arc<dyn KioskStateSink>) -> Self {
        self.state_sink = Some(sink);
        self
    }

    pub fn sounds(mut self, sounds: Arc<dyn SoundPlayer>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    /// Add a collaborator to the full reset. The session always resets first.
    pub fn reset_step(mut self, name: &'static str, target: Arc<dyn Resettable>) -> Self {
        self.reset_steps.push((name, target));
        self
    }

    /// Validate the config, wire every component and start the coordinator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Kiosk, BuildError> {
        let config = self.config.validated().map_err(BuildError::InvalidConfig)?;
        tokio::runtime::Handle::try_current().map_err(|_| BuildError::NoRuntime)?;

        let mut indicator = LoadingIndicator::from_config(&config.payment);
        if let Some(sink) = self.indicator_sink {
            indicator = indicator.with_sink(sink);
        }
        let mut payment =
            PaymentFlow::new(config.payment.clone(), self.handle.clone()).with_indicator(indicator);
        if let Some((payment_panel, ready_panel)) = self.payment_panels {
            payment = payment.with_panels(payment_panel, ready_panel);
        }
        if let Some(status) = self.status {
            payment = payment.with_status_text(status);
        }
        if let Some(sink) = &self.state_sink {
            payment = payment.with_state_sink(sink.clone());
        }
        let payment = Arc::new(payment);

        let session = Arc::new(KioskSession::new());
        let mut reset = ResetCoordinator::new(&config.reset)
            .with_step("session", session.clone())
            .with_coordinator(self.handle.clone());
        for (name, target) in self.reset_steps {
            reset = reset.with_step(name, target);
        }
        if let Some(display) = self.countdown_display {
            reset = reset.with_display(display);
        }
        if let Some(sounds) = &self.sounds {
            reset = reset.with_sounds(sounds.clone());
        }
        let reset = Arc::new(reset);

        let effect = if self.timed_fade {
            let mut fade = FadeEffect::new(config.transition.fade_duration());
            if let Some(sounds) = &self.sounds {
                fade = fade.with_sounds(sounds.clone());
            }
            Some(Arc::new(fade) as Arc<dyn TransitionEffect>)
        } else {
            self.effect
        };

        let env = FlowEnv {
            handlers: self.handlers,
            payment: Some(payment.clone()),
            reset: Some(reset.clone()),
            state_sink: self.state_sink,
            sounds: self.sounds,
        };
        let mut coordinator = StageCoordinator::new(self.inbox, env, effect)
            .with_history_limit(config.transition.history_limit);
        for (target, guard) in self.guards {
            coordinator = coordinator.with_entry_guard(target, guard);
        }

        payment.activate(&self.events);
        let task = coordinator.spawn();
        info!(
            stage = %self.handle.stage(),
            mock_payment = config.payment.use_mock,
            reset_steps = ?reset.step_names(),
            "kiosk started"
        );

        Ok(Kiosk {
            handle: self.handle,
            payment,
            reset,
            session,
            _events: self.events,
            task: Some(task),
        })
    }
}

/// A running kiosk: the coordinator task plus its side flows.
pub struct Kiosk {
    handle: CoordinatorHandle,
    payment: Arc<PaymentFlow>,
    reset: Arc<ResetCoordinator>,
    session: Arc<KioskSession>,
    // Keeps the payment listener's channel open when no switch holds a sender.
    _events: PanelEvents,
    task: Option<JoinHandle<()>>,
}

impl Kiosk {
    pub fn handle(&self) -> &CoordinatorHandle {
        &self.handle
    }

    pub fn stage(&self) -> Stage {
        self.handle.stage()
    }

    pub fn payment(&self) -> &Arc<PaymentFlow> {
        &self.payment
    }

    pub fn reset(&self) -> &Arc<ResetCoordinator> {
        &self.reset
    }

    pub fn session(&self) -> &Arc<KioskSession> {
        &self.session
    }

    /// Stop the side flows and the coordinator, waiting for it to exit.
    pub async fn shutdown(mut self) {
        self.stop_side_flows();
        self.handle.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!(error = %err, "coordinator task ended abnormally");
            }
        }
        info!("kiosk stopped");
    }

    fn stop_side_flows(&self) {
        self.payment.deactivate();
        self.reset.cancel_countdown();
    }
}

impl Drop for Kiosk {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop_side_flows();
            self.handle.shutdown();
        }
    }
}
