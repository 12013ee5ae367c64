//! End-to-end flows through a built kiosk on paused tokio time.

use kiosk_flow::builder::{Kiosk, KioskBuilder, KioskPanels};
use kiosk_flow::config::KioskConfig;
use kiosk_flow::core::{Guard, Stage};
use kiosk_flow::effects::{CoordinatorError, CoordinatorHandle};
use kiosk_flow::handlers::{KioskState, Panel, SoundCue, StageHandler};
use kiosk_flow::payment::PaymentOutcome;
use kiosk_flow::sim::{
    CountingReset, ManualEffect, MemoryCountdown, MemoryCues, MemoryKioskState, MemoryPanel,
    MemoryText,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Screens {
    ready: Arc<MemoryPanel>,
    select: Arc<MemoryPanel>,
    filming: Arc<MemoryPanel>,
    payment: Arc<MemoryPanel>,
}

impl Screens {
    fn new() -> Self {
        Self {
            ready: MemoryPanel::shown("ready"),
            select: MemoryPanel::hidden("select"),
            filming: MemoryPanel::hidden("filming"),
            payment: MemoryPanel::hidden("payment"),
        }
    }

    fn at_filming() -> Self {
        let screens = Self::new();
        screens.ready.set_active(false);
        screens.filming.set_active(true);
        screens
    }

    fn panels(&self) -> KioskPanels {
        KioskPanels {
            ready: self.ready.clone(),
            select: self.select.clone(),
            filming: self.filming.clone(),
            payment: self.payment.clone(),
        }
    }
}

fn config(always_success: bool) -> KioskConfig {
    let mut config = KioskConfig::default();
    config.payment.always_success = always_success;
    config
}

/// Let spawned listeners and timers catch up on paused time.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn ready_leg_opens_frame_selection() {
    let screens = Screens::new();
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .effect(effect.clone())
        .panels(screens.panels())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    assert_eq!(effect.starts(), 1);
    assert_eq!(kiosk.stage(), Stage::Idle);

    assert!(effect.fire());
    handle.wait_for(Stage::AwaitingSelectTransition).await.unwrap();

    assert!(!screens.ready.is_active());
    assert!(screens.select.is_active());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn filming_leg_shows_payment_and_starts_it() {
    let screens = Screens::at_filming();
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .initial(Stage::AwaitingFilmingTransition)
        .effect(effect.clone())
        .panels(screens.panels())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    effect.fire();
    handle.wait_for(Stage::PaymentReturn).await.unwrap();
    settle().await;

    assert!(!screens.filming.is_active());
    assert!(screens.payment.is_active());
    assert!(kiosk.payment().is_processing());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn approved_mock_payment_returns_to_idle_with_one_reset() {
    let screens = Screens::at_filming();
    let capture = CountingReset::new();
    let status = MemoryText::new();
    let kiosk = KioskBuilder::new(config(true))
        .initial(Stage::AwaitingFilmingTransition)
        .timed_fade()
        .panels(screens.panels())
        .status_text(status.clone())
        .reset_step("capture", capture.clone())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();
    kiosk.session().select_frame("classic");
    let first_session = kiosk.session().id();
    let started = Instant::now();

    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::PaymentReturn).await.unwrap();
    handle.wait_for(Stage::Idle).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(800 + 5000 + 800));
    assert_eq!(kiosk.reset().resets_run(), 1);
    assert_eq!(capture.count(), 1);
    assert_ne!(kiosk.session().id(), first_session);
    assert!(kiosk.session().snapshot().is_blank());
    assert!(!screens.payment.is_active());
    assert!(screens.ready.is_active());
    assert_eq!(kiosk.payment().outcome(), PaymentOutcome::Pending);
    assert!(status
        .history()
        .iter()
        .any(|text| text == "Payment approved"));

    let history = handle.history().await.unwrap();
    let legs: Vec<(Stage, Stage)> = history.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        legs,
        vec![
            (Stage::AwaitingFilmingTransition, Stage::PaymentReturn),
            (Stage::PaymentReturn, Stage::Idle),
        ]
    );
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_mock_payment_stays_on_payment_screen() {
    let screens = Screens::at_filming();
    let kiosk = KioskBuilder::new(config(false))
        .initial(Stage::AwaitingFilmingTransition)
        .timed_fade()
        .panels(screens.panels())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::PaymentReturn).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(kiosk.stage(), Stage::PaymentReturn);
    assert!(matches!(kiosk.payment().outcome(), PaymentOutcome::Failed(_)));
    assert!(kiosk.payment().message().starts_with("Payment failed.\n"));
    assert!(kiosk.payment().message().contains("MOCK"));
    assert!(screens.payment.is_active());
    assert_eq!(kiosk.reset().resets_run(), 0);
    assert_eq!(handle.history().await.unwrap().len(), 1);

    kiosk.payment().retry().unwrap();
    assert!(kiosk.payment().is_processing());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn finished_twice_runs_handler_once() {
    let screens = Screens::new();
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .effect(effect.clone())
        .panels(screens.panels())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    handle.finished().unwrap();
    handle.finished().unwrap();
    let history = handle.history().await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(kiosk.stage(), Stage::AwaitingSelectTransition);
    assert!(screens.select.is_active());
    assert!(!screens.filming.is_active());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn double_request_starts_one_effect() {
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .effect(effect.clone())
        .panels(Screens::new().panels())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    let err = handle.try_advance().await.unwrap_err();

    assert_eq!(
        err,
        CoordinatorError::ReentrantRequest {
            current: Stage::Idle,
            requested: Stage::Idle
        }
    );
    assert_eq!(effect.starts(), 1);
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn back_action_is_guarded_and_reopens_selection() {
    let screens = Screens::at_filming();
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .effect(effect.clone())
        .panels(screens.panels())
        .entry_guard(
            Stage::BackToSelect,
            Guard::only_from([Stage::AwaitingFilmingTransition]),
        )
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    let err = handle
        .try_request_transition(Stage::BackToSelect)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::GuardBlocked {
            from: Stage::Idle,
            to: Stage::BackToSelect
        }
    );
    kiosk.shutdown().await;

    let kiosk = KioskBuilder::new(config(true))
        .initial(Stage::AwaitingFilmingTransition)
        .effect(effect.clone())
        .panels(screens.panels())
        .entry_guard(
            Stage::BackToSelect,
            Guard::only_from([Stage::AwaitingFilmingTransition]),
        )
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle
        .try_request_transition(Stage::BackToSelect)
        .await
        .unwrap();
    assert_eq!(kiosk.stage(), Stage::BackToSelect);
    effect.fire();
    handle.wait_for(Stage::AwaitingSelectTransition).await.unwrap();

    assert!(!screens.filming.is_active());
    assert!(screens.select.is_active());
    assert!(!screens.payment.is_active());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn missing_effect_keeps_stage() {
    let kiosk = KioskBuilder::new(config(true))
        .panels(Screens::new().panels())
        .build()
        .unwrap();

    let err = kiosk.handle().try_advance().await.unwrap_err();

    assert_eq!(err, CoordinatorError::MissingCollaborator("transition_effect"));
    assert_eq!(kiosk.stage(), Stage::Idle);
    kiosk.shutdown().await;
}

struct AutoAdvance(CoordinatorHandle);

impl StageHandler for AutoAdvance {
    fn on_transition_finished(&self) {
        self.0.advance().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn handler_requests_run_after_the_leg_commits() {
    let screens = Screens::new();
    let builder = KioskBuilder::new(config(true))
        .timed_fade()
        .panels(screens.panels());
    let chained = AutoAdvance(builder.handle());
    let kiosk = builder.ready_to_select(Arc::new(chained)).build().unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::AwaitingFilmingTransition).await.unwrap();

    let history = handle.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].to, Stage::AwaitingSelectTransition);
    assert!(screens.filming.is_active());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unattended_countdown_resets_the_session() {
    let display = MemoryCountdown::new();
    let kiosk: Kiosk = KioskBuilder::new(config(true))
        .countdown_display(display.clone())
        .build()
        .unwrap();
    kiosk.session().record_shot("shot-1");

    kiosk.reset().start_countdown();
    tokio::time::sleep(Duration::from_secs(5)).await;
    kiosk.reset().start_countdown();
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(kiosk.reset().resets_run(), 1);
    assert!(kiosk.session().snapshot().is_blank());
    assert_eq!(display.shown().last(), Some(&None));
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unattended_countdown_moves_the_flow_to_idle() {
    let screens = Screens::at_filming();
    let cues = MemoryCues::new();
    let kiosk = KioskBuilder::new(config(true))
        .initial(Stage::AwaitingFilmingTransition)
        .timed_fade()
        .panels(screens.panels())
        .sounds(cues.clone())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();
    kiosk.session().record_shot("shot-1");
    let started = Instant::now();

    kiosk.reset().start_countdown();
    handle.wait_for(Stage::PaymentReturn).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(kiosk.reset().resets_run(), 1);
    assert!(kiosk.session().snapshot().is_blank());
    assert!(screens.payment.is_active());
    assert!(!screens.filming.is_active());
    assert_eq!(cues.count(SoundCue::OutputSuccess), 1);

    handle.wait_for(Stage::Idle).await.unwrap();
    settle().await;

    assert_eq!(kiosk.reset().resets_run(), 2);
    assert!(screens.ready.is_active());
    assert!(!screens.payment.is_active());
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn full_cycle_reports_states_and_cues() {
    let screens = Screens::new();
    let states = MemoryKioskState::new();
    let cues = MemoryCues::new();
    let kiosk = KioskBuilder::new(config(true))
        .sounds(cues.clone())
        .timed_fade()
        .panels(screens.panels())
        .state_sink(states.clone())
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::AwaitingSelectTransition).await.unwrap();
    assert_eq!(states.current(), Some(KioskState::Select));

    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::AwaitingFilmingTransition).await.unwrap();
    handle.try_advance().await.unwrap();
    handle.wait_for(Stage::PaymentReturn).await.unwrap();
    assert_eq!(states.current(), Some(KioskState::WaitingForPayment));

    handle.wait_for(Stage::Idle).await.unwrap();
    settle().await;

    assert_eq!(
        states.states(),
        vec![
            KioskState::Select,
            KioskState::WaitingForPayment,
            KioskState::Ready
        ]
    );
    let mut expected = vec![SoundCue::StartButton];
    for _ in 0..4 {
        expected.push(SoundCue::FadeIn);
        expected.push(SoundCue::FadeOut);
    }
    assert_eq!(cues.played(), expected);
    kiosk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_handle() {
    let effect = ManualEffect::new();
    let kiosk = KioskBuilder::new(config(true))
        .effect(effect)
        .build()
        .unwrap();
    let handle = kiosk.handle().clone();

    kiosk.shutdown().await;

    assert_eq!(handle.try_advance().await, Err(CoordinatorError::Closed));
    assert_eq!(handle.advance(), Err(CoordinatorError::Closed));
}
