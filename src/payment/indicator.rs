//! Rotating loading indicator shown while a payment is processing.

use crate::config::PaymentConfig;
use crate::sync::lock;
use crate::task::TaskGuard;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Where the indicator is drawn.
pub trait IndicatorSink: Send + Sync {
    fn set_visible(&self, visible: bool);
    fn set_angle(&self, degrees: f32);
}

/// Rotate clockwise by `speed * dt` degrees, keeping the angle in (-360, 0].
///
/// `angle` must already be in range; `speed` and `dt` must be non-negative.
pub fn advance_angle(angle: f32, speed: f32, dt: f32) -> f32 {
    (angle - speed * dt) % 360.0
}

#[derive(Debug, Default)]
struct Dial {
    angle: f32,
    spinning: bool,
}

pub struct LoadingIndicator {
    speed: f32,
    tick: Duration,
    dial: Arc<Mutex<Dial>>,
    sink: Option<Arc<dyn IndicatorSink>>,
    task: Mutex<Option<TaskGuard>>,
}

impl LoadingIndicator {
    pub fn new(speed: f32, tick: Duration) -> Self {
        Self {
            speed,
            tick,
            dial: Arc::new(Mutex::new(Dial::default())),
            sink: None,
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.rotate_speed, config.indicator_tick())
    }

    pub fn with_sink(mut self, sink: Arc<dyn IndicatorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Show the indicator at angle 0 and spin it once per tick.
    pub fn start(&self) {
        {
            let mut dial = lock(&self.dial);
            dial.angle = 0.0;
            dial.spinning = true;
        }
        if let Some(sink) = &self.sink {
            sink.set_visible(true);
            sink.set_angle(0.0);
        }

        let dial = Arc::clone(&self.dial);
        let sink = self.sink.clone();
        let speed = self.speed;
        let tick = self.tick;
        let guard = TaskGuard::spawn("loading_indicator", async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = Instant::now();
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;

                let angle = {
                    let mut dial = lock(&dial);
                    if !dial.spinning {
                        break;
                    }
                    dial.angle = advance_angle(dial.angle, speed, dt);
                    dial.angle
                };
                if let Some(sink) = &sink {
                    sink.set_angle(angle);
                }
            }
        });

        // Replacing an earlier loop aborts it.
        *lock(&self.task) = Some(guard);
    }

    /// Stop spinning, hide the indicator and reset the angle to 0.
    pub fn stop(&self) {
        if let Some(mut guard) = lock(&self.task).take() {
            guard.cancel();
        }
        {
            let mut dial = lock(&self.dial);
            dial.spinning = false;
            dial.angle = 0.0;
        }
        if let Some(sink) = &self.sink {
            sink.set_angle(0.0);
            sink.set_visible(false);
        }
    }

    pub fn angle(&self) -> f32 {
        lock(&self.dial).angle
    }

    pub fn is_spinning(&self) -> bool {
        lock(&self.dial).spinning
    }
}
