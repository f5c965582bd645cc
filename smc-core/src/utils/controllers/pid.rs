//! Discrete PID controller with optional continuous (wrapping) input.
use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Self {
        Self { kp, ki, kd }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Wrap `input` into `[min, max)`.
fn input_modulus(
    input: f32,
    min: f32,
    max: f32,
) -> f32 {
    let modulus = max - min;
    let wrapped = input - modulus * libm::floorf((input - min) / modulus);
    if wrapped >= max {
        wrapped - modulus
    } else {
        wrapped
    }
}

/// A simple discrete PID controller that runs at a fixed period.
///
/// The last setpoint is retained, so [`PidController::update`] can keep servoing
/// toward it between explicit [`PidController::calculate`] calls.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    period: f32,
    setpoint: f32,
    position_error: f32,
    prev_error: f32,
    total_error: f32,
    velocity_error: f32,
    continuous: Option<(f32, f32)>,
    integrator_range: (f32, f32),
    has_measurement: bool,
}

impl PidController {
    /// Create a controller running every `period` seconds.
    pub fn new(
        gains: PidGains,
        period: f32,
    ) -> Self {
        Self {
            gains,
            period,
            setpoint: 0.0,
            position_error: 0.0,
            prev_error: 0.0,
            total_error: 0.0,
            velocity_error: 0.0,
            continuous: None,
            integrator_range: (-1.0, 1.0),
            has_measurement: false,
        }
    }

    /// Treat the input as wrapping over `[min, max)`; errors always take the
    /// shorter way around.
    pub fn enable_continuous_input(
        &mut self,
        min: f32,
        max: f32,
    ) {
        self.continuous = Some((min, max));
    }

    pub fn disable_continuous_input(&mut self) {
        self.continuous = None;
    }

    pub fn is_continuous_input_enabled(&self) -> bool {
        self.continuous.is_some()
    }

    /// Bound the contribution of the integral term to `[min, max]`.
    pub fn set_integrator_range(
        &mut self,
        min: f32,
        max: f32,
    ) {
        self.integrator_range = (min, max);
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn set_setpoint(
        &mut self,
        setpoint: f32,
    ) {
        self.setpoint = setpoint;
    }

    /// Error from the most recent update.
    pub fn position_error(&self) -> f32 {
        self.position_error
    }

    /// Rate of change of the error from the most recent update.
    pub fn velocity_error(&self) -> f32 {
        self.velocity_error
    }

    /// Error between `setpoint` and `measurement`, honouring continuous input.
    pub fn error(
        &self,
        measurement: f32,
        setpoint: f32,
    ) -> f32 {
        match self.continuous {
            Some((min, max)) => {
                let bound = (max - min) / 2.0;
                input_modulus(setpoint - measurement, -bound, bound)
            }
            None => setpoint - measurement,
        }
    }

    /// Set a new setpoint and compute the output for `measurement`.
    pub fn calculate(
        &mut self,
        measurement: f32,
        setpoint: f32,
    ) -> f32 {
        self.setpoint = setpoint;
        self.update(measurement)
    }

    /// Compute the output for `measurement` against the retained setpoint.
    pub fn update(
        &mut self,
        measurement: f32,
    ) -> f32 {
        self.prev_error = self.position_error;
        self.position_error = self.error(measurement, self.setpoint);
        self.velocity_error = if self.has_measurement && self.period > 0.0 {
            (self.position_error - self.prev_error) / self.period
        } else {
            0.0
        };
        self.has_measurement = true;

        let PidGains { kp, ki, kd } = self.gains;
        if ki != 0.0 {
            // a negative ki swaps the bounds
            let (lo, hi) = self.integrator_range;
            let (a, b) = (lo / ki, hi / ki);
            self.total_error = (self.total_error + self.position_error * self.period)
                .max(a.min(b))
                .min(a.max(b));
        }

        kp * self.position_error + ki * self.total_error + kd * self.velocity_error
    }

    /// Reset integrator and derivative history.
    pub fn reset(&mut self) {
        self.position_error = 0.0;
        self.prev_error = 0.0;
        self.total_error = 0.0;
        self.velocity_error = 0.0;
        self.has_measurement = false;
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use super::*;

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new(PidGains::new(2.0, 0.0, 0.0), 0.02);
        assert!((pid.calculate(1.0, 3.0) - 4.0).abs() < 1e-6);
        assert!((pid.update(2.5) - 1.0).abs() < 1e-6);
        assert_eq!(pid.setpoint(), 3.0);
    }

    #[test]
    fn continuous_error_takes_short_way() {
        let mut pid = PidController::new(PidGains::default(), 0.02);
        pid.enable_continuous_input(-PI, PI);
        let out = pid.calculate(-PI + 0.01, PI - 0.01);
        assert!((pid.position_error() + 0.02).abs() < 1e-4);
        assert!((out + 0.02).abs() < 1e-4);
    }

    #[test]
    fn linear_error_without_continuous_input() {
        let pid = PidController::new(PidGains::default(), 0.02);
        let e = pid.error(-PI + 0.01, PI - 0.01);
        assert!((e - (2.0 * PI - 0.02)).abs() < 1e-4);
    }

    #[test]
    fn integral_is_clamped() {
        let mut pid = PidController::new(PidGains::new(0.0, 2.0, 0.0), 0.02);
        let mut out = 0.0;
        for _ in 0..1000 {
            out = pid.calculate(0.0, 10.0);
        }
        assert!((out - 1.0).abs() < 1e-4);
    }

    #[test]
    fn negative_integral_gain_is_clamped() {
        let mut pid = PidController::new(PidGains::new(0.0, -0.5, 0.0), 0.02);
        let mut out = 0.0;
        for _ in 0..1000 {
            out = pid.calculate(0.0, 10.0);
        }
        // integral bounded to [-2, 2], scaled by -0.5
        assert!((out + 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_period_skips_derivative() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.0, 1.0), 0.0);
        pid.calculate(0.0, 1.0);
        let out = pid.update(0.5);
        assert!(out.is_finite());
        assert!((out - 0.5).abs() < 1e-6);
    }

    #[test]
    fn derivative_ignores_first_sample_and_reset() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0), 0.5);
        assert_eq!(pid.calculate(0.0, 1.0), 0.0);
        // error goes 1.0 -> 0.5 over 0.5 s
        assert!((pid.update(0.5) + 1.0).abs() < 1e-6);
        pid.reset();
        assert_eq!(pid.update(0.0), 0.0);
    }
}
