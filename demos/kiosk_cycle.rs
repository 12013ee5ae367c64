//! Headless run of one full kiosk cycle.
//!
//! Ready -> frame select -> filming -> payment (mock) -> ready, with a
//! short fade and approval delay so the whole loop takes a few seconds.
//!
//! Run with: cargo run --example kiosk_cycle
//! Set RUST_LOG=debug to see every panel switch.

use kiosk_flow::builder::{KioskBuilder, KioskPanels};
use kiosk_flow::config::KioskConfig;
use kiosk_flow::core::{Guard, Stage};
use kiosk_flow::sim::{
    MemoryCountdown, MemoryCues, MemoryIndicator, MemoryKioskState, MemoryPanel, MemoryText,
};
use kiosk_flow::telemetry;

const CONFIG: &str = r#"
[transition]
fade_duration_ms = 300

[payment]
use_mock = true
always_success = true
mock_approve_delay_secs = 1.5

[reset]
countdown_secs = 3
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing()?;

    let mut config = KioskConfig::from_toml_str(CONFIG)?;
    config.apply_env_overrides()?;

    let status = MemoryText::new();
    let countdown = MemoryCountdown::new();
    let states = MemoryKioskState::new();
    let cues = MemoryCues::new();
    let kiosk = KioskBuilder::new(config)
        .timed_fade()
        .panels(KioskPanels {
            ready: MemoryPanel::shown("ready"),
            select: MemoryPanel::hidden("select"),
            filming: MemoryPanel::hidden("filming"),
            payment: MemoryPanel::hidden("payment"),
        })
        .entry_guard(
            Stage::BackToSelect,
            Guard::only_from([Stage::AwaitingFilmingTransition]),
        )
        .status_text(status.clone())
        .indicator_sink(MemoryIndicator::new())
        .countdown_display(countdown.clone())
        .state_sink(states.clone())
        .sounds(cues.clone())
        .build()?;
    let handle = kiosk.handle().clone();

    println!("=== Kiosk Cycle Demo ===\n");
    println!("Session {}", kiosk.session().id());

    // Ready -> select
    handle.try_advance().await?;
    handle.wait_for(Stage::AwaitingSelectTransition).await?;
    kiosk.session().select_frame("classic-4cut");
    println!("Stage: {}", kiosk.stage());

    // Select -> filming
    handle.try_advance().await?;
    handle.wait_for(Stage::AwaitingFilmingTransition).await?;
    for shot in 1..=4 {
        kiosk.session().record_shot(format!("shot-{shot}"));
    }
    let shots = kiosk.session().snapshot().captured_shots.len();
    println!("Stage: {} ({shots} shots)", kiosk.stage());

    // Back to select and forward again, to show the irregular leg
    handle.try_request_transition(Stage::BackToSelect).await?;
    handle.wait_for(Stage::AwaitingSelectTransition).await?;
    println!("Back action -> {}", kiosk.stage());
    handle.try_advance().await?;
    handle.wait_for(Stage::AwaitingFilmingTransition).await?;

    // Filming -> payment; the mock approves and returns to ready on its own
    handle.try_advance().await?;
    handle.wait_for(Stage::PaymentReturn).await?;
    println!("Stage: {} ({})", kiosk.stage(), kiosk.payment().message());
    handle.wait_for(Stage::Idle).await?;
    println!("Stage: {} after {} reset(s)", kiosk.stage(), kiosk.reset().resets_run());

    // Leave the kiosk unattended until the countdown resets it again
    kiosk.reset().start_countdown();
    while kiosk.reset().resets_run() < 2 {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
    println!("Countdown shown: {:?}", countdown.shown());

    println!("\nStatus messages:");
    for message in status.history() {
        println!("  {}", message.replace('\n', " "));
    }

    println!("\nKiosk states: {:?}", states.states());
    println!("Sound cues: {:?}", cues.played());

    println!("\nCommitted legs:");
    for record in handle.history().await? {
        println!("  #{} {} -> {}", record.sequence, record.from, record.to);
    }

    kiosk.shutdown().await;
    Ok(())
}
