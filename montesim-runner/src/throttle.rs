//! Pacing policy — how fast daily updates are released to the consumer.
//!
//! Speed changes what the stream feels like, never what is computed: the
//! delay is applied between day emissions, outside the engine arithmetic.

use std::time::Duration;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;
/// Initial speed for a freshly started run.
pub const DEFAULT_SPEED: f64 = 0.5;

/// Delay between day emissions at speed 1.0.
pub const BASE_DELAY: Duration = Duration::from_millis(100);
/// Floor delay once the consumer asks for faster-than-real-time pacing.
pub const FAST_DELAY: Duration = Duration::from_millis(1);

/// Keep a speed multiplier inside its legal band.
pub fn clamp_speed(speed: f64) -> f64 {
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

/// Delay to apply after emitting one day at the given speed.
pub fn delay_for_speed(speed: f64) -> Duration {
    if speed < 1.0 {
        BASE_DELAY.div_f64(speed)
    } else if speed > 1.0 {
        FAST_DELAY
    } else {
        BASE_DELAY
    }
}
