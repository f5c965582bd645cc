//! Math utilities for the swerve module.
//!
//! This module provides tick/unit conversion and the heading optimization used
//! before every command.

pub mod state;
pub mod units;
