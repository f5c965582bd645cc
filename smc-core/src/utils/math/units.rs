//! Conversion between raw encoder ticks and physical units.
//!
//! Encoders report integer ticks (and ticks per 100 ms for velocity). The
//! controller works in meters, meters per second and radians. Converting into
//! ticks rounds to the nearest whole tick; that is the only lossy step, since
//! ticks are integers and physical units are continuous.
//!
//! # Example
//! ```rust
//! use smc_core::utils::math::units::{PhysicalConstants, UnitConverter};
//! let units = UnitConverter::new(PhysicalConstants::default());
//! let ticks = units.distance_to_ticks(1.0);
//! assert!((units.ticks_to_distance(ticks) - 1.0).abs() <= units.meters_per_tick());
//! ```
use core::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Physical constants of one module, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Wheel radius (m)
    pub wheel_radius: f32,
    /// Encoder ticks per sensor revolution
    pub ticks_per_rev: u32,
    /// Sensor revolutions per wheel revolution
    pub gear_ratio: f32,
    /// Largest voltage the actuators accept (V)
    pub max_voltage: f32,
    /// Free-spin motor speed at `max_voltage` (rpm)
    pub max_motor_rpm: f32,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            wheel_radius: 0.0508,
            ticks_per_rev: 2048,
            gear_ratio: 1.0,
            max_voltage: 12.0,
            max_motor_rpm: 6380.0,
        }
    }
}

/// Bidirectional mapping between encoder ticks and physical units.
///
/// All conversions are pure functions of the [`PhysicalConstants`] captured at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter {
    constants: PhysicalConstants,
}

impl UnitConverter {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    fn circumference(&self) -> f32 {
        2.0 * PI * self.constants.wheel_radius
    }

    fn ticks_per_rev(&self) -> f32 {
        self.constants.ticks_per_rev as f32
    }

    /// Distance covered by the wheel for a single tick (m).
    pub fn meters_per_tick(&self) -> f32 {
        self.circumference() / self.constants.gear_ratio / self.ticks_per_rev()
    }

    /// Meters to encoder ticks, rounded to the nearest tick.
    pub fn distance_to_ticks(
        &self,
        meters: f32,
    ) -> i32 {
        let wheel_rotations = meters / self.circumference();
        let sensor_rotations = wheel_rotations * self.constants.gear_ratio;
        libm::roundf(sensor_rotations * self.ticks_per_rev()) as i32
    }

    /// Meters per second to encoder ticks per 100 ms.
    pub fn velocity_to_ticks_per_100ms(
        &self,
        meters_per_second: f32,
    ) -> i32 {
        let wheel_rps = meters_per_second / self.circumference();
        let sensor_rps = wheel_rps * self.constants.gear_ratio;
        libm::roundf(sensor_rps / 10.0 * self.ticks_per_rev()) as i32
    }

    /// Encoder ticks to meters.
    pub fn ticks_to_distance(
        &self,
        ticks: i32,
    ) -> f32 {
        ticks as f32 / self.ticks_per_rev() / self.constants.gear_ratio * self.circumference()
    }

    /// Encoder ticks per 100 ms to meters per second.
    pub fn ticks_per_100ms_to_velocity(
        &self,
        ticks_per_100ms: i32,
    ) -> f32 {
        self.ticks_to_distance(ticks_per_100ms) * 10.0
    }

    /// Radians to turning-encoder ticks. One encoder revolution is 2π.
    pub fn radians_to_ticks(
        &self,
        radians: f32,
    ) -> i32 {
        libm::roundf(radians / (2.0 * PI) * self.ticks_per_rev()) as i32
    }

    /// Turning-encoder ticks to radians (unwrapped).
    pub fn ticks_to_radians(
        &self,
        ticks: i32,
    ) -> f32 {
        ticks as f32 / self.ticks_per_rev() * 2.0 * PI
    }

    /// Turning-encoder ticks per 100 ms to radians per second.
    pub fn ticks_per_100ms_to_radians_per_second(
        &self,
        ticks_per_100ms: i32,
    ) -> f32 {
        self.ticks_to_radians(ticks_per_100ms) * 10.0
    }

    /// Tick rate of a motor spinning freely at full voltage.
    pub fn max_ticks_per_second(&self) -> f32 {
        self.ticks_per_rev() * self.constants.max_motor_rpm / 60.0
    }

    /// Wheel speed that the open-loop drive command maps to full voltage.
    ///
    /// `2π·r²·rpm/60`. Note the squared radius: this is a tuning constant, not
    /// the free-spin wheel speed.
    pub fn open_loop_full_scale_speed(&self) -> f32 {
        let r = self.constants.wheel_radius;
        2.0 * PI * r * r * (self.constants.max_motor_rpm / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> UnitConverter {
        UnitConverter::new(PhysicalConstants::default())
    }

    #[test]
    fn one_wheel_revolution_is_one_encoder_revolution() {
        let u = units();
        let circumference = 2.0 * PI * 0.0508;
        assert_eq!(u.distance_to_ticks(circumference), 2048);
        assert!((u.ticks_to_distance(2048) - circumference).abs() < 1e-6);
    }

    #[test]
    fn distance_round_trip_within_one_tick() {
        let u = units();
        let quantum = u.meters_per_tick();
        let mut d = -25.0f32;
        while d < 25.0 {
            let back = u.ticks_to_distance(u.distance_to_ticks(d));
            assert!((back - d).abs() <= quantum, "{} -> {}", d, back);
            d += 0.137;
        }
    }

    #[test]
    fn velocity_uses_per_100ms_convention() {
        let u = units();
        let ticks = u.velocity_to_ticks_per_100ms(3.0);
        assert_eq!(ticks, libm::roundf(u.distance_to_ticks(3.0) as f32 / 10.0) as i32);
        assert!((u.ticks_per_100ms_to_velocity(ticks) - 3.0).abs() < 10.0 * u.meters_per_tick());
    }

    #[test]
    fn gear_ratio_scales_ticks() {
        let geared = UnitConverter::new(PhysicalConstants {
            gear_ratio: 6.75,
            ..PhysicalConstants::default()
        });
        let plain = units();
        let d = 0.5;
        let ratio = geared.distance_to_ticks(d) as f32 / plain.distance_to_ticks(d) as f32;
        assert!((ratio - 6.75).abs() < 0.01);
    }

    #[test]
    fn angle_conversions_ignore_wheel_radius() {
        let u = units();
        assert_eq!(u.radians_to_ticks(PI), 1024);
        assert_eq!(u.radians_to_ticks(-PI / 2.0), -512);
        assert!((u.ticks_to_radians(512) - PI / 2.0).abs() < 1e-6);
        assert!((u.ticks_per_100ms_to_radians_per_second(2048) - 20.0 * PI).abs() < 1e-3);
    }

    #[test]
    fn motor_scaling_constants() {
        let u = units();
        assert!((u.max_ticks_per_second() - 2048.0 * 6380.0 / 60.0).abs() < 1e-1);
        assert!((u.open_loop_full_scale_speed() - 1.7241).abs() < 1e-3);
    }
}
