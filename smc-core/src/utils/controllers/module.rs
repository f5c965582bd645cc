//! Per-module swerve controller.
//!
//! `ModuleController` owns the drive and turning axes of one wheel assembly.
//! The control layer calls [`ModuleController::set_desired_state`] whenever it
//! wants a new target and [`ModuleController::periodic`] once per control
//! interval. Everything runs on the caller's thread; nothing blocks.
//!
//! # Example
//! ```rust
//! use smc_core::utils::controllers::{ModuleConfig, ModuleController, SimAxis};
//! use smc_core::utils::ModuleState;
//!
//! let mut module =
//!     ModuleController::new(SimAxis::new(), SimAxis::new(), ModuleConfig::default()).unwrap();
//! module.set_desired_state(ModuleState::new(1.0, 0.5)).unwrap();
//! for _ in 0..50 {
//!     module.periodic().unwrap();
//! }
//! assert!((module.state().unwrap().angle - 0.5).abs() < 0.01);
//! ```
use core::f32::consts::PI;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use super::{
    axis::{SensorAxis, VoltageAxis},
    feedforward::{Feedforward, NoFeedforward},
    pid::{PidController, PidGains},
    sim::{FeedbackModel, IdealVoltageModel},
    ModuleCommand, ModuleError,
};
use crate::utils::math::{
    state::{shortest_angular_distance, wrap_angle, ModulePosition, ModuleState},
    units::{PhysicalConstants, UnitConverter},
};

/// How the drive voltage is derived from the target speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Scale the target speed linearly against the open-loop full-scale speed.
    /// Drive PID gains are unused.
    #[default]
    OpenLoop,
    /// Track the measured wheel speed with the drive PID.
    ClosedLoop,
}

/// Fixed configuration of one module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub constants: PhysicalConstants,
    pub drive_gains: PidGains,
    pub turning_gains: PidGains,
    pub drive_mode: DriveMode,
    /// Control interval (ms)
    pub period_ms: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            constants: PhysicalConstants::default(),
            drive_gains: PidGains::default(),
            turning_gains: PidGains::default(),
            drive_mode: DriveMode::default(),
            period_ms: 20,
        }
    }
}

/// A [`ModuleConfig`] value the controller cannot run with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `period_ms` is zero.
    ZeroPeriod,
    /// A physical constant is zero, negative or not finite.
    Constant { name: &'static str, value: f32 },
    /// A PID gain is not finite.
    Gain { name: &'static str, value: f32 },
}

impl core::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            ConfigError::ZeroPeriod => write!(f, "period_ms must be greater than zero"),
            ConfigError::Constant { name, value } => {
                write!(f, "constants.{} must be positive and finite, got {}", name, value)
            }
            ConfigError::Gain { name, value } => {
                write!(f, "{} must be finite, got {}", name, value)
            }
        }
    }
}

impl core::error::Error for ConfigError {}

impl ModuleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    fn period_secs(&self) -> f32 {
        self.period_ms as f32 / 1000.0
    }

    /// Check the values a controller divides by or clamps against.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        let c = &self.constants;
        let constants = [
            ("wheel_radius", c.wheel_radius),
            ("ticks_per_rev", c.ticks_per_rev as f32),
            ("gear_ratio", c.gear_ratio),
            ("max_voltage", c.max_voltage),
            ("max_motor_rpm", c.max_motor_rpm),
        ];
        for (name, value) in constants {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Constant { name, value });
            }
        }
        let gains = [
            ("drive_gains.kp", self.drive_gains.kp),
            ("drive_gains.ki", self.drive_gains.ki),
            ("drive_gains.kd", self.drive_gains.kd),
            ("turning_gains.kp", self.turning_gains.kp),
            ("turning_gains.ki", self.turning_gains.ki),
            ("turning_gains.kd", self.turning_gains.kd),
        ];
        for (name, value) in gains {
            if !value.is_finite() {
                return Err(ConfigError::Gain { name, value });
            }
        }
        Ok(())
    }
}

/// Clamp `volts` into `[-max, max]`, logging when the command had to be cut.
/// A non-finite command becomes 0 V.
fn saturate(
    volts: f32,
    max: f32,
    axis: &str,
) -> f32 {
    if !volts.is_finite() {
        tracing::warn!(axis, volts, "non-finite voltage command replaced with 0 V");
        return 0.0;
    }
    let max = libm::fabsf(max);
    if volts > max || volts < -max {
        tracing::warn!(axis, volts, max, "voltage command saturated");
    }
    volts.max(-max).min(max)
}

/// Advance a simulated axis by one interval. Physical axes are left alone.
fn advance_simulation<A, M>(
    axis: &mut A,
    model: &M,
    volts: f32,
    units: &UnitConverter,
    dt: f32,
) -> Result<(), A::Error>
where
    A: SensorAxis,
    M: FeedbackModel,
{
    if axis.simulation().is_none() {
        return Ok(());
    }
    let position = axis.integrated_position()?;
    let (position, velocity) = model.advance(position, volts, units, dt);
    if let Some(sim) = axis.simulation() {
        sim.set_raw_position(position);
        sim.set_velocity(velocity);
    }
    Ok(())
}

/// Closed-loop controller for one drive/turning axis pair.
pub struct ModuleController<D, T, DF = NoFeedforward, TF = NoFeedforward, M = IdealVoltageModel> {
    drive: D,
    turning: T,
    config: ModuleConfig,
    units: UnitConverter,
    drive_pid: PidController,
    turning_pid: PidController,
    drive_ff: DF,
    turning_ff: TF,
    feedback: M,
    /// Last commanded volts, held for the simulation model.
    drive_voltage: f32,
    turning_voltage: f32,
}

impl<D, T> ModuleController<D, T>
where
    D: VoltageAxis + SensorAxis,
    T: VoltageAxis + SensorAxis,
{
    /// Take ownership of both axes. Feedforwards default to zero and the
    /// simulation model to [`IdealVoltageModel`].
    ///
    /// Fails when `config` does not pass [`ModuleConfig::validate`].
    pub fn new(
        drive: D,
        turning: T,
        config: ModuleConfig,
    ) -> Result<Self, ConfigError> {
        if let Err(error) = config.validate() {
            tracing::error!(%error, "rejected module configuration");
            return Err(error);
        }
        let period = config.period_secs();
        let drive_pid = PidController::new(config.drive_gains, period);
        let mut turning_pid = PidController::new(config.turning_gains, period);
        turning_pid.enable_continuous_input(-PI, PI);

        tracing::info!(
            drive_mode = ?config.drive_mode,
            period_ms = config.period_ms,
            "swerve module controller initialised"
        );
        if config.drive_mode == DriveMode::OpenLoop {
            tracing::info!("drive uses open-loop voltage scaling; drive PID gains are unused");
        }

        Ok(Self {
            drive,
            turning,
            config,
            units: UnitConverter::new(config.constants),
            drive_pid,
            turning_pid,
            drive_ff: NoFeedforward,
            turning_ff: NoFeedforward,
            feedback: IdealVoltageModel,
            drive_voltage: 0.0,
            turning_voltage: 0.0,
        })
    }
}

impl<D, T, DF, TF, M> ModuleController<D, T, DF, TF, M>
where
    D: VoltageAxis + SensorAxis,
    T: VoltageAxis + SensorAxis,
    DF: Feedforward,
    TF: Feedforward,
    M: FeedbackModel,
{
    /// Replace the drive feedforward (input: target speed in m/s).
    pub fn with_drive_feedforward<F: Feedforward>(
        self,
        drive_ff: F,
    ) -> ModuleController<D, T, F, TF, M> {
        ModuleController {
            drive: self.drive,
            turning: self.turning,
            config: self.config,
            units: self.units,
            drive_pid: self.drive_pid,
            turning_pid: self.turning_pid,
            drive_ff,
            turning_ff: self.turning_ff,
            feedback: self.feedback,
            drive_voltage: self.drive_voltage,
            turning_voltage: self.turning_voltage,
        }
    }

    /// Replace the turning feedforward (input: target heading rate in rad/s).
    pub fn with_turning_feedforward<F: Feedforward>(
        self,
        turning_ff: F,
    ) -> ModuleController<D, T, DF, F, M> {
        ModuleController {
            drive: self.drive,
            turning: self.turning,
            config: self.config,
            units: self.units,
            drive_pid: self.drive_pid,
            turning_pid: self.turning_pid,
            drive_ff: self.drive_ff,
            turning_ff,
            feedback: self.feedback,
            drive_voltage: self.drive_voltage,
            turning_voltage: self.turning_voltage,
        }
    }

    /// Replace the simulation feedback model.
    pub fn with_feedback_model<N: FeedbackModel>(
        self,
        feedback: N,
    ) -> ModuleController<D, T, DF, TF, N> {
        ModuleController {
            drive: self.drive,
            turning: self.turning,
            config: self.config,
            units: self.units,
            drive_pid: self.drive_pid,
            turning_pid: self.turning_pid,
            drive_ff: self.drive_ff,
            turning_ff: self.turning_ff,
            feedback,
            drive_voltage: self.drive_voltage,
            turning_voltage: self.turning_voltage,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitConverter {
        &self.units
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn turning(&self) -> &T {
        &self.turning
    }

    /// Hand the axes back.
    pub fn release(self) -> (D, T) {
        (self.drive, self.turning)
    }

    pub fn drive_voltage(&self) -> f32 {
        self.drive_voltage
    }

    pub fn turning_voltage(&self) -> f32 {
        self.turning_voltage
    }

    /// Continuous turning error (rad) from the most recent loop evaluation.
    pub fn turning_error(&self) -> f32 {
        self.turning_pid.position_error()
    }

    /// Heading (rad) the turning loop is servoing toward.
    pub fn turning_setpoint(&self) -> f32 {
        self.turning_pid.setpoint()
    }

    /// Unwrapped turning-axis angle (rad).
    fn turning_distance(&mut self) -> Result<f32, ModuleError<D::Error, T::Error>> {
        let ticks = self
            .turning
            .integrated_position()
            .map_err(ModuleError::Turning)?;
        Ok(self.units.ticks_to_radians(ticks))
    }

    fn drive_velocity(&mut self) -> Result<f32, ModuleError<D::Error, T::Error>> {
        let ticks = self
            .drive
            .integrated_velocity()
            .map_err(ModuleError::Drive)?;
        Ok(self.units.ticks_per_100ms_to_velocity(ticks))
    }

    /// Sensed speed (m/s) and heading.
    pub fn state(&mut self) -> Result<ModuleState, ModuleError<D::Error, T::Error>> {
        let speed = self.drive_velocity()?;
        let angle = self.turning_distance()?;
        Ok(ModuleState::new(speed, angle))
    }

    /// Integrated drive distance (m) and heading.
    pub fn position(&mut self) -> Result<ModulePosition, ModuleError<D::Error, T::Error>> {
        let ticks = self
            .drive
            .integrated_position()
            .map_err(ModuleError::Drive)?;
        let angle = self.turning_distance()?;
        Ok(ModulePosition {
            distance: self.units.ticks_to_distance(ticks),
            angle: wrap_angle(angle),
        })
    }

    /// Turning-axis rate (rad/s).
    pub fn turning_velocity(&mut self) -> Result<f32, ModuleError<D::Error, T::Error>> {
        let ticks = self
            .turning
            .integrated_velocity()
            .map_err(ModuleError::Turning)?;
        Ok(self.units.ticks_per_100ms_to_radians_per_second(ticks))
    }

    fn drive_output(
        &mut self,
        target_speed: f32,
    ) -> Result<f32, ModuleError<D::Error, T::Error>> {
        let feedback = match self.config.drive_mode {
            DriveMode::OpenLoop => {
                self.config.constants.max_voltage * target_speed
                    / self.units.open_loop_full_scale_speed()
            }
            DriveMode::ClosedLoop => {
                let measured = self.drive_velocity()?;
                self.drive_pid.calculate(measured, target_speed)
            }
        };
        Ok(feedback + self.drive_ff.calculate(target_speed))
    }

    /// Optimize `desired` against the sensed heading and command both axes.
    ///
    /// Returns the optimized state that was commanded.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_desired_state(
        &mut self,
        desired: ModuleState,
    ) -> Result<ModuleState, ModuleError<D::Error, T::Error>> {
        let current = self.turning_distance()?;
        let state = desired.optimize(current);
        let max = self.config.constants.max_voltage;

        let drive_output = self.drive_output(state.speed)?;

        let previous_setpoint = self.turning_pid.setpoint();
        let turn_output = self.turning_pid.calculate(current, state.angle);
        let turn_rate = shortest_angular_distance(previous_setpoint, state.angle)
            / self.config.period_secs();
        let turn_ff = self.turning_ff.calculate(turn_rate);

        let drive_volts = saturate(drive_output, max, "drive");
        let turning_volts = saturate(turn_output + turn_ff, max, "turning");

        self.drive
            .set_voltage(drive_volts)
            .map_err(ModuleError::Drive)?;
        self.drive_voltage = drive_volts;
        self.turning
            .set_voltage(turning_volts)
            .map_err(ModuleError::Turning)?;
        self.turning_voltage = turning_volts;

        tracing::debug!(
            speed = state.speed,
            angle = state.angle,
            drive_volts,
            turning_volts,
            "module command"
        );
        Ok(state)
    }

    /// Park the module pointed forward at zero speed.
    pub fn zero_module(&mut self) -> Result<ModuleState, ModuleError<D::Error, T::Error>> {
        self.set_desired_state(ModuleState::new(0.0, 0.0))
    }

    /// Run one control interval.
    ///
    /// Simulated axes are first advanced from the last commanded voltages. The
    /// turning loop is then re-evaluated against its retained setpoint and the
    /// new voltage issued. The drive axis keeps its last voltage.
    pub fn periodic(&mut self) -> Result<(), ModuleError<D::Error, T::Error>> {
        let dt = self.config.period_secs();
        advance_simulation(
            &mut self.drive,
            &self.feedback,
            self.drive_voltage,
            &self.units,
            dt,
        )
        .map_err(ModuleError::Drive)?;
        advance_simulation(
            &mut self.turning,
            &self.feedback,
            self.turning_voltage,
            &self.units,
            dt,
        )
        .map_err(ModuleError::Turning)?;

        let measured = self.turning_distance()?;
        let output = self.turning_pid.update(measured) + self.turning_ff.calculate(0.0);
        let turning_volts = saturate(output, self.config.constants.max_voltage, "turning");
        self.turning
            .set_voltage(turning_volts)
            .map_err(ModuleError::Turning)?;
        self.turning_voltage = turning_volts;

        tracing::trace!(
            measured,
            error = self.turning_pid.position_error(),
            turning_volts,
            "periodic"
        );
        Ok(())
    }

    /// Execute a [`ModuleCommand`].
    ///
    /// `Set` and `Zero` return the optimized state that was commanded; `Read`
    /// returns the sensed state.
    pub fn execute_command(
        &mut self,
        command: ModuleCommand,
    ) -> Result<ModuleState, ModuleError<D::Error, T::Error>> {
        match command {
            ModuleCommand::Set { s, a } => self.set_desired_state(ModuleState::new(s, a)),
            ModuleCommand::Zero => self.zero_module(),
            ModuleCommand::Read => self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::controllers::sim::SimAxis;

    fn sim_module(turning_ticks: i32) -> ModuleController<SimAxis, SimAxis> {
        ModuleController::new(
            SimAxis::new(),
            SimAxis::with_position(turning_ticks),
            ModuleConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn open_loop_drive_scaling() {
        let mut m = sim_module(0);
        m.set_desired_state(ModuleState::new(1.0, 0.0)).unwrap();
        let expected = 12.0 / m.units().open_loop_full_scale_speed();
        assert!((m.drive_voltage() - expected).abs() < 1e-4);
        assert!((m.drive().voltage() - expected).abs() < 1e-4);
    }

    #[test]
    fn drive_voltage_is_clamped() {
        let mut m = sim_module(0);
        m.set_desired_state(ModuleState::new(50.0, 0.0)).unwrap();
        assert_eq!(m.drive_voltage(), 12.0);
        m.set_desired_state(ModuleState::new(-50.0, 0.0)).unwrap();
        assert_eq!(m.drive_voltage(), -12.0);
    }

    #[test]
    fn turning_voltage_follows_error() {
        // 256 ticks = π/4
        let mut m = sim_module(256);
        m.set_desired_state(ModuleState::new(0.0, 0.0)).unwrap();
        assert!((m.turning_error() + PI / 4.0).abs() < 1e-4);
        assert!((m.turning_voltage() + PI / 4.0).abs() < 1e-4);
    }

    #[test]
    fn closed_loop_uses_drive_pid() {
        let config = ModuleConfig {
            drive_mode: DriveMode::ClosedLoop,
            drive_gains: PidGains::new(2.0, 0.0, 0.0),
            ..ModuleConfig::default()
        };
        let mut m = ModuleController::new(SimAxis::new(), SimAxis::new(), config).unwrap();
        m.set_desired_state(ModuleState::new(1.5, 0.0)).unwrap();
        // measured speed is zero
        assert!((m.drive_voltage() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn feedforward_is_added() {
        let mut m = sim_module(0).with_drive_feedforward(|v: f32| 0.5 * v);
        m.set_desired_state(ModuleState::new(0.5, 0.0)).unwrap();
        let expected = 12.0 * 0.5 / m.units().open_loop_full_scale_speed() + 0.25;
        assert!((m.drive_voltage() - expected).abs() < 1e-4);
    }

    #[test]
    fn period_is_twenty_ms() {
        assert_eq!(ModuleConfig::default().period(), Duration::from_millis(20));
    }

    #[test]
    fn saturate_maps_non_finite_to_zero() {
        assert_eq!(saturate(f32::NAN, 12.0, "drive"), 0.0);
        assert_eq!(saturate(f32::INFINITY, 12.0, "drive"), 0.0);
        assert_eq!(saturate(f32::NEG_INFINITY, 12.0, "turning"), 0.0);
        assert_eq!(saturate(-20.0, 12.0, "turning"), -12.0);
    }

    #[test]
    fn saturate_tolerates_negative_bound() {
        assert_eq!(saturate(20.0, -12.0, "drive"), 12.0);
        assert_eq!(saturate(-3.0, -12.0, "drive"), -3.0);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert_eq!(ModuleConfig::default().validate(), Ok(()));

        let zero_period = ModuleConfig {
            period_ms: 0,
            ..ModuleConfig::default()
        };
        assert_eq!(zero_period.validate(), Err(ConfigError::ZeroPeriod));

        let mut negative_voltage = ModuleConfig::default();
        negative_voltage.constants.max_voltage = -12.0;
        assert_eq!(
            negative_voltage.validate(),
            Err(ConfigError::Constant {
                name: "max_voltage",
                value: -12.0
            })
        );

        let mut no_ticks = ModuleConfig::default();
        no_ticks.constants.ticks_per_rev = 0;
        assert!(matches!(
            no_ticks.validate(),
            Err(ConfigError::Constant {
                name: "ticks_per_rev",
                ..
            })
        ));

        let mut nan_gain = ModuleConfig::default();
        nan_gain.turning_gains.kd = f32::NAN;
        assert!(matches!(
            nan_gain.validate(),
            Err(ConfigError::Gain {
                name: "turning_gains.kd",
                ..
            })
        ));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ModuleConfig {
            period_ms: 0,
            ..ModuleConfig::default()
        };
        assert!(matches!(
            ModuleController::new(SimAxis::new(), SimAxis::new(), config),
            Err(ConfigError::ZeroPeriod)
        ));
    }
}
