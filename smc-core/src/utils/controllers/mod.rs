//! Module Exports
//!
//! This file exports the control-side modules of the swerve module controller.
//!
//! - `axis`: capability traits for voltage-commandable and tick-reporting axes.
//! - `pid` / `feedforward`: feedback and feedforward loops.
//! - `sim`: simulated axes and the voltage-to-ticks feedback model.
//! - `pwm`: PCA9685-backed voltage axis over I2C.
//! - `module`: the per-module controller.

pub mod axis;
pub mod feedforward;
pub mod module;
pub mod pid;
pub mod pwm;
pub mod sim;

use serde::{Deserialize, Serialize};

pub use axis::{Axis, SensorAxis, SimulatedSensor, SplitAxis, SplitAxisError, VoltageAxis};
pub use feedforward::{Feedforward, NoFeedforward, SimpleMotorFeedforward};
pub use module::{ConfigError, DriveMode, ModuleConfig, ModuleController};
pub use pid::{PidController, PidGains};
pub use sim::{FeedbackModel, IdealVoltageModel, SimAxis};

/// Commands accepted from the control layer.
///
/// Serialized as JSON with tag `"mc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "mc", rename_all = "snake_case")] // mc = module command
pub enum ModuleCommand {
    /// Drive at `s` m/s with the wheel pointed at `a` rad.
    Set { s: f32, a: f32 },
    /// Park the module pointed forward at zero speed.
    Zero,
    /// Read back the sensed state.
    Read,
}

/// Errors raised by the drive or turning axis.
#[derive(Debug)]
pub enum ModuleError<DE, TE> {
    Drive(DE),
    Turning(TE),
}

impl<DE, TE> core::fmt::Display for ModuleError<DE, TE>
where
    DE: core::fmt::Debug,
    TE: core::fmt::Debug,
{
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            ModuleError::Drive(e) => write!(f, "drive axis error: {:?}", e),
            ModuleError::Turning(e) => write!(f, "turning axis error: {:?}", e),
        }
    }
}

impl<DE, TE> core::error::Error for ModuleError<DE, TE>
where
    DE: core::fmt::Debug,
    TE: core::fmt::Debug,
{
}
