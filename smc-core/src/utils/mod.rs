//! Utility re-exports for the swerve module controller.
//!
//! - `controllers`: axis capabilities, PID/feedforward loops, simulation and the
//!   module controller itself
//! - `math`: unit conversion between encoder ticks and physical units, plus
//!   module state optimization

pub mod controllers;
pub mod math;

pub use controllers::module::{ModuleConfig, ModuleController};
pub use embassy_time::Duration;
pub use math::state::{ModulePosition, ModuleState};
pub use math::units::{PhysicalConstants, UnitConverter};
