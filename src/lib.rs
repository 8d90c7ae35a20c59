//! Analog stick calibration and linearization for notched, spherically moving sticks.
//!
//! Raw calibration samples go through [`clean_cal_points`] (or
//! [`CleanedCalibrationPoints::from_temp_calibration_points`]) and then
//! [`linearize_cal`] (or [`LinearizedCalibration::from_points`]), which stores
//! a cubic fit per axis in [`StickParams`].
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod curve_fit;
pub mod helpers;
pub mod stick;

pub use config::{ConfigError, FitPosition, FitSource, FitTargets, GateLayout};
pub use curve_fit::{CurveFitter, LeastSquaresFit};
pub use helpers::XyValuePair;
pub use stick::{
    angle_on_sphere, calc_stick_values, clean_cal_points, linearize, linearize_cal,
    trimmed_origin_mean, CleanedCalibrationPoints, LinearizedCalibration, NotchStatus,
    StickParams,
};
