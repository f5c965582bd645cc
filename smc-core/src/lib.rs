//! Core control logic for one corner of a swerve drivetrain on no-std embedded platforms.
//!
//! For a runnable simulation, see the `smc-app/sim-module` binary.
#![no_std]

pub mod utils;
