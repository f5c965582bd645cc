//! PCA9685-backed voltage axis.
//!
//! Each motor is wired to an H-bridge driven by two PWM channels of a PCA9685
//! on a shared I2C bus: a phase channel selecting direction and an enable
//! channel whose duty cycle sets the fraction of supply voltage.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::axis::{Axis, VoltageAxis};

/// Largest on/off count of a PCA9685 channel.
const MAX_DUTY: u16 = 4095;

/// A voltage-commandable axis on one phase/enable channel pair.
pub struct PwmAxis<'a, I2C: 'static> {
    pwm: Pca9685<RefCellDevice<'a, I2C>>,
    phase: Channel,
    enable: Channel,
    max_voltage: f32,
}

impl<'a, I2C, E> PwmAxis<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Bind a channel pair of the PCA9685 at `address`.
    ///
    /// `max_voltage` is the supply voltage that a 100 % duty cycle delivers.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        address: u8,
        phase: Channel,
        enable: Channel,
        max_voltage: f32,
    ) -> Result<Self, PwmError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))?;
        Ok(Self {
            pwm,
            phase,
            enable,
            max_voltage,
        })
    }

    /// Enable the PWM driver and set its prescale (60 Hz).
    pub fn configure(&mut self) -> Result<(), PwmError<E>> {
        self.pwm.enable()?;
        tracing::info!("PWM enabled");
        self.pwm.set_prescale(100)?;
        tracing::info!("PWM prescale set to 60Hz");
        Ok(())
    }

    /// Duty count for `volts`, saturated at full scale. A non-finite command
    /// maps to zero duty.
    pub fn duty_for(
        &self,
        volts: f32,
    ) -> u16 {
        if !volts.is_finite() {
            return 0;
        }
        let fraction = (libm::fabsf(volts) / self.max_voltage).min(1.0);
        (fraction * MAX_DUTY as f32) as u16
    }
}

impl<I2C, E> Axis for PwmAxis<'_, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = PwmError<E>;
}

impl<I2C, E> VoltageAxis for PwmAxis<'_, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error> {
        let duty = self.duty_for(volts);
        let forward = volts >= 0.0;
        self.pwm
            .set_channel_on_off(self.phase, 0, if forward { 0 } else { MAX_DUTY })?;
        self.pwm.set_channel_on_off(self.enable, 0, duty)?;
        Ok(())
    }
}
