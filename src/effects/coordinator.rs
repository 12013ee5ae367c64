//! The stage coordinator actor.
//!
//! Owns the current `Stage`, serializes legs behind the transition effect and
//! dispatches each `Finished` to the leg's handler. The leg's side effects run
//! as a Stillwater effect against a `FlowEnv`; the stage commits only after
//! that effect succeeds.

use super::error::CoordinatorError;
use super::handle::{FlowCommand, FlowInbox};
use super::transition::{FinishedSignal, TransitionEffect};
use crate::core::{Guard, Leg, LegKind, Stage, StateHistory};
use crate::handlers::{HandlerSet, KioskState, KioskStateSink, SoundCue, SoundPlayer};
use crate::payment::PaymentFlow;
use crate::reset::ResetCoordinator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stillwater::effect::{BoxedEffect, Effect};
use stillwater::prelude::*;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Collaborators a leg may touch.
#[derive(Clone, Default)]
pub struct FlowEnv {
    pub handlers: HandlerSet,
    pub payment: Option<Arc<PaymentFlow>>,
    pub reset: Option<Arc<ResetCoordinator>>,
    pub state_sink: Option<Arc<dyn KioskStateSink>>,
    pub sounds: Option<Arc<dyn SoundPlayer>>,
}

impl FlowEnv {
    /// Feedback given as soon as a leg is requested, before its effect runs.
    pub fn on_requested(&self, kind: LegKind) {
        if kind == LegKind::ReadyToSelect {
            self.set_state(KioskState::Select);
            self.play(SoundCue::StartButton);
        }
    }

    /// Run the side effects of one leg.
    pub fn run_leg(&self, kind: LegKind) -> Result<(), CoordinatorError> {
        if kind == LegKind::PaymentCompletion {
            return self.complete_payment();
        }

        let handler = self
            .handlers
            .for_leg(kind)
            .ok_or(CoordinatorError::MissingCollaborator(kind.name()))?;
        handler.on_transition_finished();
        if kind == LegKind::SessionEnd {
            self.set_state(KioskState::WaitingForPayment);
        }
        Ok(())
    }

    fn set_state(&self, state: KioskState) {
        match &self.state_sink {
            Some(sink) => sink.set_state(state),
            None => debug!(?state, "no kiosk state sink wired"),
        }
    }

    fn play(&self, cue: SoundCue) {
        if let Some(sounds) = &self.sounds {
            sounds.play(cue);
        }
    }

    fn complete_payment(&self) -> Result<(), CoordinatorError> {
        let payment = self
            .payment
            .as_ref()
            .ok_or(CoordinatorError::MissingCollaborator("payment_flow"))?;
        payment.finish_return()?;

        match &self.reset {
            Some(reset) => reset.run_full_reset(),
            None => warn!("reset coordinator is missing, session state kept"),
        }
        Ok(())
    }
}

impl fmt::Debug for FlowEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowEnv")
            .field("handlers", &self.handlers)
            .field("payment", &self.payment.is_some())
            .field("reset", &self.reset)
            .field("state_sink", &self.state_sink.is_some())
            .field("sounds", &self.sounds.is_some())
            .finish()
    }
}

/// The effect run for a leg when its `Finished` arrives.
pub fn leg_action(kind: LegKind) -> BoxedEffect<LegKind, CoordinatorError, FlowEnv> {
    from_fn(move |env: &FlowEnv| env.run_leg(kind).map(|_| kind)).boxed()
}

/// Single owner of the kiosk `Stage`.
pub struct StageCoordinator {
    stage: Stage,
    in_flight: bool,
    effect: Option<Arc<dyn TransitionEffect>>,
    env: FlowEnv,
    guards: HashMap<Stage, Guard<Stage>>,
    history: StateHistory<Stage>,
    commands: mpsc::UnboundedReceiver<FlowCommand>,
    sender: mpsc::UnboundedSender<FlowCommand>,
    published: watch::Sender<Stage>,
}

impl StageCoordinator {
    /// Build a coordinator starting at the stage the inbox was created with.
    ///
    /// A missing effect is not an error here: every request will be
    /// rejected with `MissingCollaborator` and the flow stays put.
    pub fn new(inbox: FlowInbox, env: FlowEnv, effect: Option<Arc<dyn TransitionEffect>>) -> Self {
        let stage = *inbox.stage.borrow();
        if effect.is_none() {
            warn!("transition effect is missing; the flow will not advance");
        }
        for kind in env.handlers.missing() {
            warn!(leg = kind.name(), "stage handler is missing");
        }
        Self {
            stage,
            in_flight: false,
            effect,
            env,
            guards: HashMap::new(),
            history: StateHistory::default(),
            commands: inbox.commands,
            sender: inbox.sender,
            published: inbox.stage,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = StateHistory::with_limit(limit);
        self
    }

    /// Only allow requests for `target` while the guard accepts the current stage.
    pub fn with_entry_guard(mut self, target: Stage, guard: Guard<Stage>) -> Self {
        self.guards.insert(target, guard);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn history(&self) -> &StateHistory<Stage> {
        &self.history
    }

    /// Set the stage to `requested` and start the transition effect.
    pub fn request_transition(&mut self, requested: Stage) -> Result<(), CoordinatorError> {
        if self.in_flight {
            return Err(CoordinatorError::ReentrantRequest {
                current: self.stage,
                requested,
            });
        }
        let Some(effect) = self.effect.clone() else {
            return Err(CoordinatorError::MissingCollaborator("transition_effect"));
        };
        if requested != self.stage {
            if let Some(guard) = self.guards.get(&requested) {
                if !guard.check(&self.stage) {
                    return Err(CoordinatorError::GuardBlocked {
                        from: self.stage,
                        to: requested,
                    });
                }
            }
        }

        debug!(from = %self.stage, to = %requested, "transition requested");
        self.set_stage(requested);
        self.in_flight = true;
        if let Some(leg) = requested.leg() {
            self.env.on_requested(leg.kind);
        }
        effect.start(FinishedSignal::new(self.sender.clone()));
        Ok(())
    }

    /// Run the leg of the current stage.
    pub fn advance(&mut self) -> Result<(), CoordinatorError> {
        self.request_transition(self.stage)
    }

    /// Handle the effect's `Finished` event, returning the committed stage.
    ///
    /// The in-flight flag clears whatever the outcome, so a failed leg can
    /// be requested again.
    pub async fn on_finished(&mut self) -> Result<Stage, CoordinatorError> {
        if !self.in_flight {
            return Err(CoordinatorError::NoTransitionInFlight { stage: self.stage });
        }
        self.in_flight = false;

        let Some(leg) = self.stage.leg() else {
            return Err(CoordinatorError::UnrecognizedStage { stage: self.stage });
        };

        let span = info_span!("leg", kind = leg.kind.name(), from = %leg.from, to = %leg.to);
        self.run_leg(leg).instrument(span).await
    }

    async fn run_leg(&mut self, leg: Leg) -> Result<Stage, CoordinatorError> {
        leg_action(leg.kind).run(&self.env).await?;

        self.set_stage(leg.to);
        let record = self.history.record(leg.from, leg.to);
        info!(sequence = record.sequence, "leg committed");
        Ok(leg.to)
    }

    /// Process commands on a tokio task until `shutdown`.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(stage = %self.stage, "coordinator started");
        while let Some(command) = self.commands.recv().await {
            match command {
                FlowCommand::Request { stage, reply } => {
                    let result = match stage {
                        Some(stage) => self.request_transition(stage),
                        None => self.advance(),
                    };
                    if let Err(err) = &result {
                        warn!(error = %err, "transition request rejected");
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                FlowCommand::Finished => {
                    if let Err(err) = self.on_finished().await {
                        warn!(stage = %self.stage, error = %err, "leg did not complete");
                    }
                }
                FlowCommand::History(reply) => {
                    let _ = reply.send(self.history.transitions());
                }
                FlowCommand::Shutdown => break,
            }
        }
        info!(stage = %self.stage, "coordinator stopped");
    }

    fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
        self.published.send_replace(stage);
    }
}

impl fmt::Debug for StageCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCoordinator")
            .field("stage", &self.stage)
            .field("in_flight", &self.in_flight)
            .field("effect", &self.effect.is_some())
            .field("env", &self.env)
            .field("guards", &self.guards.keys().collect::<Vec<_>>())
            .field("history", &self.history.total_recorded())
            .finish()
    }
}
