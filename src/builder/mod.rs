//! Builder API for assembling a kiosk.
//!
//! [`KioskBuilder`] validates the configuration, wires the payment flow,
//! the reset sequence and the stage handlers into one environment, and
//! starts the coordinator task.
//!
//! # Example
//!
//! ```rust
//! use kiosk_flow::builder::{KioskBuilder, KioskPanels};
//! use kiosk_flow::config::KioskConfig;
//! use kiosk_flow::core::Stage;
//! use kiosk_flow::sim::MemoryPanel;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let kiosk = KioskBuilder::new(KioskConfig::default())
//!     .timed_fade()
//!     .panels(KioskPanels {
//!         ready: MemoryPanel::shown("ready"),
//!         select: MemoryPanel::hidden("select"),
//!         filming: MemoryPanel::hidden("filming"),
//!         payment: MemoryPanel::hidden("payment"),
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(kiosk.stage(), Stage::Idle);
//! kiosk.shutdown().await;
//! # }
//! ```

mod error;
mod kiosk;

pub use error::BuildError;
pub use kiosk::{Kiosk, KioskBuilder, KioskPanels};
