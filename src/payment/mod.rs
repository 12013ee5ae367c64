//! Payment side flow.
//!
//! The payment runs beside the stage machine: it starts when the payment
//! panel appears, resolves on its own schedule and only then re-enters the
//! coordinator by requesting the `PaymentReturn` leg. Failures never touch
//! the coordinator; the kiosk stays on the payment screen until a retry.

mod indicator;

pub use indicator::{advance_angle, IndicatorSink, LoadingIndicator};

use crate::config::PaymentConfig;
use crate::core::{Stage, State};
use crate::effects::{CoordinatorError, CoordinatorHandle};
use crate::handlers::{KioskState, KioskStateSink, Panel, PanelEvent, PanelEvents};
use crate::sync::lock;
use crate::task::TaskGuard;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub const PROCESSING_MESSAGE: &str = "Processing payment...";
pub const APPROVED_MESSAGE: &str = "Payment approved";
pub const MOCK_FAILURE_REASON: &str = "MOCK: payment declined (test mode)";

/// Result of the current payment attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Pending,
    Approved,
    Failed(String),
}

impl State for PaymentOutcome {
    fn name(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Failed(_) => "Failed",
        }
    }

    fn is_resting(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    /// Timer-driven stand-in resolved by `PaymentConfig::always_success`.
    Mock,
    /// Waits for `on_approved` / `on_failed` from an external processor.
    Real,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("Payment flow is not active")]
    Inactive,

    #[error("A payment is already processing")]
    AlreadyProcessing,

    #[error("No payment is processing")]
    NotProcessing,
}

/// Text widget showing payment status.
pub trait StatusText: Send + Sync {
    fn set_text(&self, text: &str);
}

#[derive(Default)]
struct PaymentState {
    active: bool,
    processing: bool,
    outcome: Option<PaymentOutcome>,
    message: String,
    routine: Option<TaskGuard>,
    listener: Option<TaskGuard>,
}

pub struct PaymentFlow {
    config: PaymentConfig,
    coordinator: CoordinatorHandle,
    indicator: LoadingIndicator,
    payment_panel: Option<Arc<dyn Panel>>,
    ready_panel: Option<Arc<dyn Panel>>,
    status: Option<Arc<dyn StatusText>>,
    state_sink: Option<Arc<dyn KioskStateSink>>,
    state: Mutex<PaymentState>,
}

impl PaymentFlow {
    pub fn new(config: PaymentConfig, coordinator: CoordinatorHandle) -> Self {
        let indicator = LoadingIndicator::from_config(&config);
        Self {
            config,
            coordinator,
            indicator,
            payment_panel: None,
            ready_panel: None,
            status: None,
            state_sink: None,
            state: Mutex::new(PaymentState::default()),
        }
    }

    /// Panels swapped when the payment return leg completes.
    pub fn with_panels(mut self, payment: Arc<dyn Panel>, ready: Arc<dyn Panel>) -> Self {
        self.payment_panel = Some(payment);
        self.ready_panel = Some(ready);
        self
    }

    pub fn with_status_text(mut self, status: Arc<dyn StatusText>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_state_sink(mut self, sink: Arc<dyn KioskStateSink>) -> Self {
        self.state_sink = Some(sink);
        self
    }

    pub fn with_indicator(mut self, indicator: LoadingIndicator) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn mode(&self) -> PaymentMode {
        if self.config.use_mock {
            PaymentMode::Mock
        } else {
            PaymentMode::Real
        }
    }

    /// Subscribe to panel events and start right away if the payment panel
    /// is already showing.
    ///
    /// Both paths go through `try_start`, so a payment starts at most once.
    pub fn activate(self: &Arc<Self>, events: &PanelEvents) {
        let mut rx = events.subscribe();
        let flow = Arc::downgrade(self);
        let listener = TaskGuard::spawn("payment_panel_listener", async move {
            loop {
                match rx.recv().await {
                    Ok(PanelEvent::PaymentPanelEnabled) => {
                        let Some(flow) = flow.upgrade() else { break };
                        let _ = flow.try_start();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "payment listener lagged behind panel events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        {
            let mut state = self.state();
            state.active = true;
            state.listener = Some(listener);
        }
        debug!("payment flow activated");

        if self.payment_panel.as_ref().is_some_and(|p| p.is_active()) {
            let _ = self.try_start();
        }
    }

    /// End of scope: unsubscribe and cancel anything in progress.
    pub fn deactivate(&self) {
        let (listener, routine) = {
            let mut state = self.state();
            state.active = false;
            state.processing = false;
            (state.listener.take(), state.routine.take())
        };
        drop(listener);
        drop(routine);
        self.indicator.stop();
        debug!("payment flow deactivated");
    }

    /// Begin a payment unless one is already running.
    pub fn try_start(self: &Arc<Self>) -> Result<(), PaymentError> {
        let mut state = self.state();
        if !state.active {
            debug!("payment start ignored: flow inactive");
            return Err(PaymentError::Inactive);
        }
        if state.processing {
            info!("payment already processing");
            return Err(PaymentError::AlreadyProcessing);
        }

        state.processing = true;
        state.outcome = Some(PaymentOutcome::Pending);
        self.indicator.start();
        self.show(&mut state, PROCESSING_MESSAGE.to_string());

        match self.mode() {
            PaymentMode::Mock => {
                info!(
                    delay_secs = self.config.mock_approve_delay_secs,
                    always_success = self.config.always_success,
                    "mock payment started"
                );
                let flow = Arc::downgrade(self);
                let delay = self.config.mock_approve_delay();
                state.routine = Some(TaskGuard::spawn("mock_payment", async move {
                    tokio::time::sleep(delay).await;
                    resolve_mock(flow);
                }));
            }
            PaymentMode::Real => {
                info!("payment request handed to processor");
            }
        }
        Ok(())
    }

    /// Start again after a failure.
    pub fn retry(self: &Arc<Self>) -> Result<(), PaymentError> {
        info!(outcome = self.outcome().name(), "payment retry requested");
        self.try_start()
    }

    /// Processor callback: the payment went through.
    pub fn on_approved(&self) -> Result<(), PaymentError> {
        let routine = {
            let mut state = self.state();
            if !state.processing {
                warn!("approval received with no payment processing");
                return Err(PaymentError::NotProcessing);
            }
            state.processing = false;
            state.outcome = Some(PaymentOutcome::Approved);
            self.show(&mut state, APPROVED_MESSAGE.to_string());
            state.routine.take()
        };
        drop(routine);
        self.indicator.stop();
        info!("payment approved");

        if let Err(err) = self.coordinator.request_transition(Stage::PaymentReturn) {
            warn!(error = %err, "could not request payment return");
        }
        Ok(())
    }

    /// Processor callback: the payment was declined or errored.
    pub fn on_failed(&self, reason: impl Into<String>) -> Result<(), PaymentError> {
        let reason = reason.into();
        let routine = {
            let mut state = self.state();
            if !state.processing {
                warn!(%reason, "failure received with no payment processing");
                return Err(PaymentError::NotProcessing);
            }
            state.processing = false;
            state.outcome = Some(PaymentOutcome::Failed(reason.clone()));
            self.show(&mut state, format!("Payment failed.\n{reason}"));
            state.routine.take()
        };
        drop(routine);
        self.indicator.stop();
        warn!(%reason, "payment failed");
        // Back to waiting so the visitor can retry.
        self.report(KioskState::WaitingForPayment);
        Ok(())
    }

    /// Completion of the `PaymentReturn` leg.
    ///
    /// Consumes an approved outcome, closes the payment panel and shows the
    /// ready panel. Any other outcome keeps the kiosk on the payment screen.
    pub fn finish_return(&self) -> Result<(), CoordinatorError> {
        {
            let mut state = self.state();
            if state.outcome != Some(PaymentOutcome::Approved) {
                warn!(
                    outcome = state.outcome.as_ref().map_or("None", |o| o.name()),
                    "payment return without approval"
                );
                return Err(CoordinatorError::PaymentNotApproved);
            }
            state.outcome = None;
            state.message.clear();
        }

        match (&self.payment_panel, &self.ready_panel) {
            (Some(payment), Some(ready)) => {
                payment.set_active(false);
                ready.set_active(true);
            }
            _ => warn!("payment or ready panel reference is missing"),
        }
        self.report(KioskState::Ready);
        info!("payment flow returned to ready");
        Ok(())
    }

    /// Outcome of the current attempt; `Pending` when nothing was attempted.
    pub fn outcome(&self) -> PaymentOutcome {
        self.state()
            .outcome
            .clone()
            .unwrap_or(PaymentOutcome::Pending)
    }

    pub fn is_processing(&self) -> bool {
        self.state().processing
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn message(&self) -> String {
        self.state().message.clone()
    }

    pub fn indicator(&self) -> &LoadingIndicator {
        &self.indicator
    }

    fn show(&self, state: &mut PaymentState, message: String) {
        if let Some(status) = &self.status {
            status.set_text(&message);
        }
        state.message = message;
    }

    fn report(&self, state: KioskState) {
        if let Some(sink) = &self.state_sink {
            sink.set_state(state);
        }
    }

    fn state(&self) -> MutexGuard<'_, PaymentState> {
        lock(&self.state)
    }
}

fn resolve_mock(flow: Weak<PaymentFlow>) {
    let Some(flow) = flow.upgrade() else { return };
    let result = if flow.config.always_success {
        flow.on_approved()
    } else {
        flow.on_failed(MOCK_FAILURE_REASON)
    };
    if let Err(err) = result {
        debug!(error = %err, "mock payment resolved after cancellation");
    }
}
