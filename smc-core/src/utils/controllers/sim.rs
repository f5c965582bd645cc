//! Simulated axes and the voltage-to-encoder feedback model.
//!
//! When no physical actuator is present, the module controller advances the
//! simulated encoder counters once per control interval from the last voltage
//! it commanded. How that voltage maps to ticks is a [`FeedbackModel`].
use core::convert::Infallible;

use super::axis::{Axis, SensorAxis, SimulatedSensor, VoltageAxis};
use crate::utils::math::units::UnitConverter;

/// Maps a held voltage to new simulated encoder counters.
pub trait FeedbackModel {
    /// Returns `(position, velocity)` after `dt` seconds at `volts`.
    fn advance(
        &self,
        position: i32,
        volts: f32,
        units: &UnitConverter,
        dt: f32,
    ) -> (i32, i32);
}

/// Ideal first-order motor: speed is proportional to voltage, with no inertia
/// or load.
///
/// Each interval adds `(volts / max_voltage) · max_ticks_per_second · dt` ticks
/// and reports that per-interval increment as the velocity. Both values are
/// truncated toward zero when stored as ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdealVoltageModel;

impl IdealVoltageModel {
    /// Ticks gained during one interval of `dt` seconds.
    ///
    /// Computed in `f64` so that accumulated positions keep whole-tick
    /// resolution past 2^24 ticks.
    pub fn increment(
        volts: f32,
        units: &UnitConverter,
        dt: f32,
    ) -> f64 {
        (volts as f64 / units.constants().max_voltage as f64)
            * units.max_ticks_per_second() as f64
            * dt as f64
    }
}

impl FeedbackModel for IdealVoltageModel {
    fn advance(
        &self,
        position: i32,
        volts: f32,
        units: &UnitConverter,
        dt: f32,
    ) -> (i32, i32) {
        let step = Self::increment(volts, units, dt);
        ((position as f64 + step) as i32, step as i32)
    }
}

/// An in-memory axis: stores the last voltage and exposes raw counters that
/// the feedback model writes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimAxis {
    position: i32,
    velocity: i32,
    voltage: f32,
}

impl SimAxis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the axis at `ticks`.
    pub fn with_position(ticks: i32) -> Self {
        Self {
            position: ticks,
            ..Self::default()
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn velocity(&self) -> i32 {
        self.velocity
    }

    /// Last voltage written by the controller.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }
}

impl Axis for SimAxis {
    type Error = Infallible;
}

impl VoltageAxis for SimAxis {
    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error> {
        self.voltage = volts;
        Ok(())
    }
}

impl SensorAxis for SimAxis {
    fn integrated_position(&mut self) -> Result<i32, Self::Error> {
        Ok(self.position)
    }

    fn integrated_velocity(&mut self) -> Result<i32, Self::Error> {
        Ok(self.velocity)
    }

    fn simulation(&mut self) -> Option<&mut dyn SimulatedSensor> {
        Some(self)
    }
}

impl SimulatedSensor for SimAxis {
    fn set_raw_position(
        &mut self,
        ticks: i32,
    ) {
        self.position = ticks;
    }

    fn set_velocity(
        &mut self,
        ticks_per_100ms: i32,
    ) {
        self.velocity = ticks_per_100ms;
    }
}
