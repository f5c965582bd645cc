//! Feedforward strategies for the drive and turning loops.
//!
//! A feedforward maps a target (speed or angular rate) to a voltage
//! contribution added on top of the feedback output. Any `Fn(f32) -> f32`
//! closure is accepted as a strategy.
use serde::{Deserialize, Serialize};

/// Voltage contribution computed from a target value.
pub trait Feedforward {
    fn calculate(
        &self,
        target: f32,
    ) -> f32;
}

/// Contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedforward;

impl Feedforward for NoFeedforward {
    fn calculate(
        &self,
        _target: f32,
    ) -> f32 {
        0.0
    }
}

impl<F> Feedforward for F
where
    F: Fn(f32) -> f32,
{
    fn calculate(
        &self,
        target: f32,
    ) -> f32 {
        self(target)
    }
}

/// Static-friction, velocity and acceleration feedforward for a DC motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleMotorFeedforward {
    /// Static friction voltage (V)
    pub ks: f32,
    /// Voltage per unit of velocity
    pub kv: f32,
    /// Voltage per unit of acceleration
    pub ka: f32,
}

impl SimpleMotorFeedforward {
    pub const fn new(
        ks: f32,
        kv: f32,
        ka: f32,
    ) -> Self {
        Self { ks, kv, ka }
    }

    pub fn calculate_with_acceleration(
        &self,
        velocity: f32,
        acceleration: f32,
    ) -> f32 {
        let friction = if velocity > 0.0 {
            self.ks
        } else if velocity < 0.0 {
            -self.ks
        } else {
            0.0
        };
        friction + self.kv * velocity + self.ka * acceleration
    }
}

impl Feedforward for SimpleMotorFeedforward {
    fn calculate(
        &self,
        target: f32,
    ) -> f32 {
        self.calculate_with_acceleration(target, 0.0)
    }
}
