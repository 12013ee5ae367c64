//! Kiosk configuration.
//!
//! Every setting has a default, so an empty file is a valid config.
//! Values come from TOML, then environment overrides, and are checked by
//! [`KioskConfig::validate`], which reports every problem at once.
//!
//! ```rust
//! use kiosk_flow::config::KioskConfig;
//!
//! let config = KioskConfig::from_toml_str(
//!     r#"
//!     [payment]
//!     always_success = false
//!
//!     [reset]
//!     countdown_secs = 30
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.payment.use_mock);
//! assert!(!config.payment.always_success);
//! assert_eq!(config.reset.countdown_secs, 30);
//! ```

pub mod error;

pub use error::ConfigError;

use crate::core::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub const ENV_USE_MOCK_PAYMENT: &str = "KIOSK_USE_MOCK_PAYMENT";
pub const ENV_ALWAYS_SUCCESS: &str = "KIOSK_ALWAYS_SUCCESS";
pub const ENV_MOCK_APPROVE_DELAY_SECS: &str = "KIOSK_MOCK_APPROVE_DELAY_SECS";
pub const ENV_AUTO_RESET_SECS: &str = "KIOSK_AUTO_RESET_SECS";

/// Longest accepted mock approval delay, one hour.
pub const MAX_MOCK_APPROVE_DELAY_SECS: f64 = 3600.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub transition: TransitionConfig,
    pub payment: PaymentConfig,
    pub reset: ResetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Duration of the built-in timed fade.
    pub fade_duration_ms: u64,
    /// Committed legs kept in the coordinator history.
    pub history_limit: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fade_duration_ms: 800,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl TransitionConfig {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Resolve payments with a timer instead of waiting for a processor.
    pub use_mock: bool,
    pub mock_approve_delay_secs: f64,
    /// Mock payments approve when true and fail when false.
    pub always_success: bool,
    /// Loading indicator speed in degrees per second, clockwise.
    pub rotate_speed: f32,
    pub indicator_tick_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            use_mock: true,
            mock_approve_delay_secs: 5.0,
            always_success: true,
            rotate_speed: 360.0,
            indicator_tick_ms: 16,
        }
    }
}

impl PaymentConfig {
    /// The mock delay, clamped into `0..=MAX_MOCK_APPROVE_DELAY_SECS`.
    pub fn mock_approve_delay(&self) -> Duration {
        let secs = self.mock_approve_delay_secs;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs.min(MAX_MOCK_APPROVE_DELAY_SECS))
    }

    pub fn indicator_tick(&self) -> Duration {
        Duration::from_millis(self.indicator_tick_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Seconds of inactivity before the automatic full reset.
    pub countdown_secs: u32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self { countdown_secs: 10 }
    }
}

impl KioskConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; unparsable values are errors.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_USE_MOCK_PAYMENT) {
            self.payment.use_mock = parse_override(ENV_USE_MOCK_PAYMENT, &v)?;
        }
        if let Some(v) = lookup(ENV_ALWAYS_SUCCESS) {
            self.payment.always_success = parse_override(ENV_ALWAYS_SUCCESS, &v)?;
        }
        if let Some(v) = lookup(ENV_MOCK_APPROVE_DELAY_SECS) {
            self.payment.mock_approve_delay_secs = parse_override(ENV_MOCK_APPROVE_DELAY_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_AUTO_RESET_SECS) {
            self.reset.countdown_secs = parse_override(ENV_AUTO_RESET_SECS, &v)?;
        }
        Ok(())
    }

    /// Check every setting, accumulating ALL violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigError>> {
        let delay = self.payment.mock_approve_delay_secs;
        let speed = self.payment.rotate_speed;

        let checks = vec![
            check(
                (0.0..=MAX_MOCK_APPROVE_DELAY_SECS).contains(&delay),
                "payment.mock_approve_delay_secs",
                "between 0 and 3600 seconds",
                delay,
            ),
            check(
                speed.is_finite() && speed >= 0.0,
                "payment.rotate_speed",
                "a finite number >= 0",
                speed,
            ),
            check(
                self.payment.indicator_tick_ms > 0,
                "payment.indicator_tick_ms",
                "> 0",
                self.payment.indicator_tick_ms,
            ),
            check(
                self.reset.countdown_secs >= 1,
                "reset.countdown_secs",
                ">= 1",
                self.reset.countdown_secs,
            ),
            check(
                self.transition.history_limit >= 1,
                "transition.history_limit",
                ">= 1",
                self.transition.history_limit,
            ),
        ];

        Validation::all_vec(checks).map(|_| ())
    }

    /// `validate` as a `Result` listing every problem.
    pub fn validated(self) -> Result<Self, Vec<ConfigError>> {
        match self.validate() {
            Validation::Success(_) => Ok(self),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}

fn check(
    ok: bool,
    field: &'static str,
    requirement: &'static str,
    value: impl ToString,
) -> Validation<(), NonEmptyVec<ConfigError>> {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(ConfigError::OutOfRange {
            field,
            requirement,
            value: value.to_string(),
        })
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key,
            value: raw.to_string(),
        })
}
