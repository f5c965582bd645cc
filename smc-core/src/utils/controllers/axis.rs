//! Capability interfaces for the drive and turning axes.
//!
//! The controller never talks to a motor controller directly. It commands
//! voltages through [`VoltageAxis`] and reads integrated ticks through
//! [`SensorAxis`], so any hardware binding or fake satisfying both traits can
//! sit behind it.

/// Common error type shared by an axis' capabilities.
pub trait Axis {
    type Error: core::fmt::Debug;
}

/// An actuator that accepts a voltage command.
pub trait VoltageAxis: Axis {
    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error>;
}

/// A rotary sensor reporting integrated ticks.
pub trait SensorAxis: Axis {
    /// Integrated position (ticks).
    fn integrated_position(&mut self) -> Result<i32, Self::Error>;

    /// Integrated velocity (ticks per 100 ms).
    fn integrated_velocity(&mut self) -> Result<i32, Self::Error>;

    /// Simulation hooks. Physical sensors return `None`.
    fn simulation(&mut self) -> Option<&mut dyn SimulatedSensor> {
        None
    }
}

/// Write access to a simulated sensor's raw counters.
pub trait SimulatedSensor {
    fn set_raw_position(
        &mut self,
        ticks: i32,
    );

    fn set_velocity(
        &mut self,
        ticks_per_100ms: i32,
    );
}

/// Errors from a [`SplitAxis`].
#[derive(Debug)]
pub enum SplitAxisError<AE, SE> {
    Actuator(AE),
    Sensor(SE),
}

/// An axis assembled from a separate actuator and sensor, e.g. a PWM motor
/// driver paired with an external encoder.
///
/// The actuator is treated as physical, so the pair exposes no simulation
/// hooks unless it was built with [`SplitAxis::with_simulated_sensor`].
pub struct SplitAxis<A, S> {
    pub actuator: A,
    pub sensor: S,
    simulated: bool,
}

impl<A, S> SplitAxis<A, S> {
    pub fn new(
        actuator: A,
        sensor: S,
    ) -> Self {
        Self {
            actuator,
            sensor,
            simulated: false,
        }
    }

    /// Hardware-in-the-loop pairing: the actuator is driven as usual and the
    /// controller also advances the sensor's simulation hooks, if it has any.
    pub fn with_simulated_sensor(
        actuator: A,
        sensor: S,
    ) -> Self {
        Self {
            actuator,
            sensor,
            simulated: true,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }
}

impl<A, S> Axis for SplitAxis<A, S>
where
    A: VoltageAxis,
    S: SensorAxis,
{
    type Error = SplitAxisError<A::Error, S::Error>;
}

impl<A, S> VoltageAxis for SplitAxis<A, S>
where
    A: VoltageAxis,
    S: SensorAxis,
{
    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error> {
        self.actuator
            .set_voltage(volts)
            .map_err(SplitAxisError::Actuator)
    }
}

impl<A, S> SensorAxis for SplitAxis<A, S>
where
    A: VoltageAxis,
    S: SensorAxis,
{
    fn integrated_position(&mut self) -> Result<i32, Self::Error> {
        self.sensor
            .integrated_position()
            .map_err(SplitAxisError::Sensor)
    }

    fn integrated_velocity(&mut self) -> Result<i32, Self::Error> {
        self.sensor
            .integrated_velocity()
            .map_err(SplitAxisError::Sensor)
    }

    fn simulation(&mut self) -> Option<&mut dyn SimulatedSensor> {
        if self.simulated {
            self.sensor.simulation()
        } else {
            None
        }
    }
}
